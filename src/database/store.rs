//! Postgres-backed implementation of the settlement storage seam.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::invoice_repository::{Invoice, InvoiceRepository};
use crate::database::payment_intent_repository::{
    IntentStatus, NewPaymentIntent, PaymentIntent, PaymentIntentRepository,
};
use crate::database::payment_repository::{NewPayment, PaymentRepository, PaymentStatus};
use crate::payments::types::Provider;
use crate::settlement::SettlementStore;

/// Bundles the three repositories the settlement path touches.
pub struct PgSettlementStore {
    invoices: InvoiceRepository,
    intents: PaymentIntentRepository,
    payments: PaymentRepository,
}

impl PgSettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            invoices: InvoiceRepository::new(pool.clone()),
            intents: PaymentIntentRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool),
        }
    }
}

#[async_trait]
impl SettlementStore for PgSettlementStore {
    async fn find_invoice(&self, invoice_id: &str) -> Result<Option<Invoice>, DatabaseError> {
        self.invoices.find_by_id(invoice_id).await
    }

    async fn create_intent(
        &self,
        intent: &NewPaymentIntent,
    ) -> Result<PaymentIntent, DatabaseError> {
        self.intents.insert(intent).await
    }

    async fn find_intent_by_reference(
        &self,
        provider: Provider,
        provider_reference: &str,
    ) -> Result<Option<PaymentIntent>, DatabaseError> {
        self.intents
            .find_by_reference(provider.as_str(), provider_reference)
            .await
    }

    async fn mark_intent_status(
        &self,
        intent_id: Uuid,
        status: IntentStatus,
    ) -> Result<(), DatabaseError> {
        self.intents.mark_status(intent_id, status).await
    }

    async fn insert_payment(&self, payment: &NewPayment) -> Result<Option<Uuid>, DatabaseError> {
        self.payments.insert_idempotent(payment).await
    }

    async fn find_payment_status(
        &self,
        provider: Provider,
        provider_txn_id: &str,
    ) -> Result<Option<PaymentStatus>, DatabaseError> {
        Ok(self
            .payments
            .find_by_provider_txn(provider.as_str(), provider_txn_id)
            .await?
            .map(|p| p.status))
    }

    async fn mark_invoice_paid(&self, invoice_id: &str) -> Result<bool, DatabaseError> {
        self.invoices.mark_paid(invoice_id).await
    }
}
