use std::fmt;

/// Custom database error type for the settlement store.
#[derive(Debug, Clone)]
pub enum DatabaseErrorKind {
    /// Connection pool is exhausted
    PoolExhausted,
    /// Connection timeout
    ConnectionTimeout,
    /// Record not found
    NotFound { entity: String, id: String },
    /// Unique constraint violation (e.g., duplicate key)
    UniqueConstraintViolation { constraint: String },
    /// Foreign key constraint violation
    ForeignKeyViolation { constraint: String },
    /// Query execution error
    QueryError { message: String },
    /// Transaction error
    TransactionError { message: String },
    /// Database connection error
    ConnectionError { message: String },
    /// Configuration error
    ConfigError { message: String },
    /// Unknown error
    Unknown { message: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub is_retryable: bool,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let is_retryable = matches!(
            kind,
            DatabaseErrorKind::ConnectionTimeout
                | DatabaseErrorKind::PoolExhausted
                | DatabaseErrorKind::ConnectionError { .. }
        );

        Self { kind, is_retryable }
    }

    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }

    /// Map SQLx error to our custom error type
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::new(DatabaseErrorKind::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            }),
            sqlx::Error::PoolTimedOut => Self::new(DatabaseErrorKind::PoolExhausted),
            sqlx::Error::PoolClosed => Self::new(DatabaseErrorKind::ConnectionError {
                message: "Connection pool is closed".to_string(),
            }),
            sqlx::Error::Configuration(msg) => Self::new(DatabaseErrorKind::ConfigError {
                message: msg.to_string(),
            }),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                match code.as_deref() {
                    // Postgres unique_violation
                    Some("23505") => {
                        Self::new(DatabaseErrorKind::UniqueConstraintViolation { constraint })
                    }
                    // Postgres foreign_key_violation
                    Some("23503") => {
                        Self::new(DatabaseErrorKind::ForeignKeyViolation { constraint })
                    }
                    _ => Self::new(DatabaseErrorKind::QueryError {
                        message: db_err.message().to_string(),
                    }),
                }
            }
            sqlx::Error::Io(io_err) => Self::new(DatabaseErrorKind::ConnectionError {
                message: io_err.to_string(),
            }),
            _ => Self::new(DatabaseErrorKind::Unknown {
                message: error.to_string(),
            }),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.kind {
            DatabaseErrorKind::PoolExhausted => {
                "Database connection pool exhausted. Please try again.".to_string()
            }
            DatabaseErrorKind::ConnectionTimeout => {
                "Database connection timed out. Please try again.".to_string()
            }
            DatabaseErrorKind::NotFound { entity, id } => {
                format!("{} with ID '{}' not found", entity, id)
            }
            DatabaseErrorKind::UniqueConstraintViolation { constraint } => {
                format!("Unique constraint '{}' violated", constraint)
            }
            DatabaseErrorKind::ForeignKeyViolation { constraint } => {
                format!("Foreign key constraint '{}' violated", constraint)
            }
            DatabaseErrorKind::QueryError { message } => {
                format!("Database query failed: {}", message)
            }
            DatabaseErrorKind::TransactionError { message } => {
                format!("Transaction failed: {}", message)
            }
            DatabaseErrorKind::ConnectionError { message } => {
                format!("Database connection error: {}", message)
            }
            DatabaseErrorKind::ConfigError { message } => {
                format!("Database configuration error: {}", message)
            }
            DatabaseErrorKind::Unknown { message } => {
                format!("Unknown database error: {}", message)
            }
        };

        write!(f, "{}", message)
    }
}

impl std::error::Error for DatabaseError {}
