//! Settlement state machine.
//!
//! Per (provider, provider_transaction_id) the states are
//! `unseen -> recorded(succeeded) | recorded(failed)`, and the transition
//! happens at most once no matter how many times the provider redelivers a
//! callback. The winning insert alone may move the invoice to `paid`, via
//! a status-guarded update that no-ops for losing concurrent callers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::invoice_repository::Invoice;
use crate::database::payment_intent_repository::{IntentStatus, NewPaymentIntent, PaymentIntent};
use crate::database::payment_repository::{NewPayment, PaymentStatus};
use crate::error::{PaymentError, PaymentResult};
use crate::payments::reference;
use crate::payments::types::{Provider, SettlementOutcome, VerifiedCallback};

/// Storage seam for the settlement path.
///
/// `insert_payment` and `mark_invoice_paid` must be atomic single
/// operations against the backing store (unique-constraint-guarded insert,
/// conditional update) — never a read-then-write pair.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn find_invoice(&self, invoice_id: &str) -> Result<Option<Invoice>, DatabaseError>;

    async fn create_intent(
        &self,
        intent: &NewPaymentIntent,
    ) -> Result<PaymentIntent, DatabaseError>;

    async fn find_intent_by_reference(
        &self,
        provider: Provider,
        provider_reference: &str,
    ) -> Result<Option<PaymentIntent>, DatabaseError>;

    async fn mark_intent_status(
        &self,
        intent_id: Uuid,
        status: IntentStatus,
    ) -> Result<(), DatabaseError>;

    /// Atomically insert a payment keyed by (provider, provider_txn_id).
    /// `None` means a row with that key already exists.
    async fn insert_payment(&self, payment: &NewPayment) -> Result<Option<Uuid>, DatabaseError>;

    /// Status of the payment recorded under (provider, provider_txn_id),
    /// if any.
    async fn find_payment_status(
        &self,
        provider: Provider,
        provider_txn_id: &str,
    ) -> Result<Option<PaymentStatus>, DatabaseError>;

    /// Conditionally transition an invoice to `paid`. Returns whether this
    /// call performed the transition.
    async fn mark_invoice_paid(&self, invoice_id: &str) -> Result<bool, DatabaseError>;
}

/// Records verified callbacks into payment and invoice state, exactly once
/// per provider transaction id.
pub struct SettlementRecorder {
    store: Arc<dyn SettlementStore>,
}

impl SettlementRecorder {
    pub fn new(store: Arc<dyn SettlementStore>) -> Self {
        Self { store }
    }

    /// Record a verified callback.
    ///
    /// Only callbacks that passed signature verification may reach this
    /// point; protocol-level rejections are handled upstream and never
    /// mutate payment state.
    pub async fn record(&self, callback: &VerifiedCallback) -> PaymentResult<SettlementOutcome> {
        let invoice_id = reference::decode_invoice_id(&callback.reference)?;

        let invoice = self
            .store
            .find_invoice(&invoice_id)
            .await?
            .ok_or_else(|| PaymentError::UnknownInvoice(invoice_id.clone()))?;

        if callback.success && callback.amount != invoice.total_amount {
            return Err(PaymentError::AmountMismatch {
                invoice_id,
                expected: invoice.total_amount,
                got: callback.amount,
            });
        }

        let intent = self
            .store
            .find_intent_by_reference(callback.provider, &callback.reference)
            .await?;

        let new_payment = NewPayment {
            intent_id: intent.as_ref().map(|i| i.id),
            invoice_id: invoice_id.clone(),
            provider: callback.provider.as_str().to_string(),
            provider_txn_id: callback.provider_txn_id.clone(),
            amount: callback.amount,
            status: if callback.success {
                PaymentStatus::Succeeded
            } else {
                PaymentStatus::Failed
            },
            raw_payload: callback.raw.clone(),
        };

        let payment_id = match self.store.insert_payment(&new_payment).await? {
            Some(id) => id,
            None => {
                // Redelivery of a transaction we have already recorded.
                // Payment rows are never deleted, so the row that won the
                // original insert is still there to report its outcome.
                let status = self
                    .store
                    .find_payment_status(callback.provider, &callback.provider_txn_id)
                    .await?
                    .unwrap_or(new_payment.status);
                info!(
                    provider = %callback.provider,
                    provider_txn_id = %callback.provider_txn_id,
                    original_status = ?status,
                    "duplicate callback, already recorded"
                );
                return Ok(SettlementOutcome::AlreadyRecorded { status });
            }
        };

        if !callback.success {
            if let Some(intent) = &intent {
                self.store
                    .mark_intent_status(intent.id, IntentStatus::Failed)
                    .await?;
            }
            info!(
                invoice_id = %invoice_id,
                provider_txn_id = %callback.provider_txn_id,
                response_code = %callback.response_code,
                "recorded failed payment"
            );
            return Ok(SettlementOutcome::FailureRecorded { payment_id });
        }

        let transitioned = self.store.mark_invoice_paid(&invoice_id).await?;
        if transitioned {
            if let Some(intent) = &intent {
                self.store
                    .mark_intent_status(intent.id, IntentStatus::Succeeded)
                    .await?;
            }
            info!(
                invoice_id = %invoice_id,
                provider = %callback.provider,
                provider_txn_id = %callback.provider_txn_id,
                amount = callback.amount,
                "invoice settled"
            );
        } else {
            // The payment row won its insert but the invoice was already
            // terminal (e.g. a second provider transaction for an invoice
            // settled moments ago). The row stays for audit; the invoice
            // and intents are left alone.
            warn!(
                invoice_id = %invoice_id,
                status = ?invoice.status,
                provider_txn_id = %callback.provider_txn_id,
                "successful payment recorded but invoice was already terminal"
            );
        }

        Ok(SettlementOutcome::Settled { payment_id })
    }
}
