use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

/// Payment entity, created only in response to verified callbacks.
///
/// (provider, provider_txn_id) is unique: that constraint, not application
/// code, is what guarantees at most one row per provider transaction under
/// at-least-once callback delivery.
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub intent_id: Option<Uuid>,
    pub invoice_id: String,
    pub provider: String,
    pub provider_txn_id: String,
    /// Amount in minor units.
    pub amount: i64,
    pub status: PaymentStatus,
    /// Full callback payload, kept for audit.
    pub raw_payload: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fields for recording a payment from a verified callback.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub intent_id: Option<Uuid>,
    pub invoice_id: String,
    pub provider: String,
    pub provider_txn_id: String,
    pub amount: i64,
    pub status: PaymentStatus,
    pub raw_payload: serde_json::Value,
}

pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a payment keyed by (provider, provider_txn_id) as a single
    /// atomic operation. Returns the new row id, or `None` when a row with
    /// that key already exists — the duplicate-delivery path.
    ///
    /// Never split into a check-then-insert pair: two concurrent duplicate
    /// notifications would both pass the check and both settle.
    pub async fn insert_idempotent(
        &self,
        payment: &NewPayment,
    ) -> Result<Option<Uuid>, DatabaseError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "INSERT INTO payments
                 (id, intent_id, invoice_id, provider, provider_txn_id, amount, status, raw_payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (provider, provider_txn_id) DO NOTHING
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(payment.intent_id)
        .bind(&payment.invoice_id)
        .bind(&payment.provider)
        .bind(&payment.provider_txn_id)
        .bind(payment.amount)
        .bind(payment.status)
        .bind(&payment.raw_payload)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.map(|(id,)| id))
    }

    pub async fn find_by_provider_txn(
        &self,
        provider: &str,
        provider_txn_id: &str,
    ) -> Result<Option<Payment>, DatabaseError> {
        sqlx::query_as::<_, Payment>(
            "SELECT id, intent_id, invoice_id, provider, provider_txn_id,
                    amount, status, raw_payload, created_at
             FROM payments
             WHERE provider = $1 AND provider_txn_id = $2",
        )
        .bind(provider)
        .bind(provider_txn_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
