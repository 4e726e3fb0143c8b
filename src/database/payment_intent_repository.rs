use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Lifecycle of a checkout attempt. At most one intent per invoice may
/// ever reach `Succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "intent_status", rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Payment intent entity, created once per initiated checkout attempt.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub invoice_id: String,
    pub provider: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
    /// Opaque order reference sent to the provider (see
    /// `payments::reference`); comes back verbatim in callbacks.
    pub provider_reference: String,
    pub metadata: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Fields for creating a fresh pending intent.
#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub invoice_id: String,
    pub provider: String,
    pub amount: i64,
    pub currency: String,
    pub provider_reference: String,
    pub metadata: serde_json::Value,
}

pub struct PaymentIntentRepository {
    pool: PgPool,
}

impl PaymentIntentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, intent: &NewPaymentIntent) -> Result<PaymentIntent, DatabaseError> {
        sqlx::query_as::<_, PaymentIntent>(
            "INSERT INTO payment_intents
                 (id, invoice_id, provider, amount, currency, status, provider_reference, metadata)
             VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
             RETURNING id, invoice_id, provider, amount, currency, status,
                       provider_reference, metadata, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&intent.invoice_id)
        .bind(&intent.provider)
        .bind(intent.amount)
        .bind(&intent.currency)
        .bind(&intent.provider_reference)
        .bind(&intent.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_reference(
        &self,
        provider: &str,
        provider_reference: &str,
    ) -> Result<Option<PaymentIntent>, DatabaseError> {
        sqlx::query_as::<_, PaymentIntent>(
            "SELECT id, invoice_id, provider, amount, currency, status,
                    provider_reference, metadata, created_at, updated_at
             FROM payment_intents
             WHERE provider = $1 AND provider_reference = $2",
        )
        .bind(provider)
        .bind(provider_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn mark_status(
        &self,
        id: Uuid,
        status: IntentStatus,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE payment_intents SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }
}
