use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgPool};

/// Invoice status. `Paid` and `Void` are terminal: the settlement path
/// never transitions an invoice out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Void)
    }
}

/// Invoice entity. Owned by the invoicing subsystem; the settlement layer
/// reads status for pre-checks and performs the guarded `paid` transition.
#[derive(Debug, Clone, FromRow)]
pub struct Invoice {
    pub id: String,
    /// Total in minor units.
    pub total_amount: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for invoice reads and the settlement-side status transition.
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "SELECT id, total_amount, currency, status, created_at, updated_at
             FROM invoices WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Transition an invoice to `paid`, guarded so terminal states are
    /// never overwritten. Returns whether this caller performed the
    /// transition; a `false` from a losing concurrent caller is a no-op,
    /// not an error.
    pub async fn mark_paid(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE invoices SET status = 'paid', updated_at = NOW()
             WHERE id = $1 AND status NOT IN ('paid', 'void')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "INSERT INTO invoices (id, total_amount, currency, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, total_amount, currency, status, created_at, updated_at",
        )
        .bind(&invoice.id)
        .bind(invoice.total_amount)
        .bind(&invoice.currency)
        .bind(invoice.status)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Void.is_terminal());
        assert!(!InvoiceStatus::Draft.is_terminal());
        assert!(!InvoiceStatus::Issued.is_terminal());
    }
}
