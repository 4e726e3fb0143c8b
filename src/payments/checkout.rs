//! Checkout initiation: precondition checks, intent allocation and the
//! provider-specific signed request.

use std::sync::Arc;

use tracing::info;

use crate::database::invoice_repository::InvoiceStatus;
use crate::database::payment_intent_repository::{IntentStatus, NewPaymentIntent};
use crate::error::{PaymentError, PaymentResult};
use crate::payments::providers::{vnpay::VnpayProvider, zalopay::ZalopayProvider};
use crate::payments::reference;
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{
    CheckoutOutcome, CheckoutRequest, Provider, ProviderCheckoutParams,
};
use crate::settlement::SettlementStore;

/// Orchestrates payment initiation for an invoice.
pub struct CheckoutService {
    store: Arc<dyn SettlementStore>,
    vnpay: Arc<VnpayProvider>,
    zalopay: Arc<ZalopayProvider>,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        vnpay: Arc<VnpayProvider>,
        zalopay: Arc<ZalopayProvider>,
    ) -> Self {
        Self {
            store,
            vnpay,
            zalopay,
        }
    }

    fn provider(&self, provider: Provider) -> &dyn PaymentProvider {
        match provider {
            Provider::Vnpay => self.vnpay.as_ref(),
            Provider::Zalopay => self.zalopay.as_ref(),
        }
    }

    /// Initiate a checkout: validate the invoice, allocate a pending
    /// intent with a fresh provider reference, and build the signed
    /// redirect.
    ///
    /// An already-paid invoice short-circuits to an idempotent
    /// `AlreadyPaid` outcome without creating a new intent.
    pub async fn start(&self, request: CheckoutRequest) -> PaymentResult<CheckoutOutcome> {
        let invoice = self
            .store
            .find_invoice(&request.invoice_id)
            .await?
            .ok_or_else(|| PaymentError::UnknownInvoice(request.invoice_id.clone()))?;

        match invoice.status {
            InvoiceStatus::Void => {
                return Err(PaymentError::InvoiceVoid(invoice.id));
            }
            InvoiceStatus::Paid => {
                return Ok(CheckoutOutcome::AlreadyPaid {
                    invoice_id: invoice.id,
                });
            }
            InvoiceStatus::Draft | InvoiceStatus::Issued => {}
        }

        if request.currency != "VND" {
            return Err(PaymentError::Unsupported("non-VND settlement"));
        }
        if request.amount != invoice.total_amount {
            return Err(PaymentError::AmountMismatch {
                invoice_id: invoice.id,
                expected: invoice.total_amount,
                got: request.amount,
            });
        }

        let provider = self.provider(request.provider);
        let provider_reference =
            provider.prepare_reference(&reference::encode(&invoice.id, &reference::new_token()));

        let intent = self
            .store
            .create_intent(&NewPaymentIntent {
                invoice_id: invoice.id.clone(),
                provider: request.provider.as_str().to_string(),
                amount: invoice.total_amount,
                currency: invoice.currency.clone(),
                provider_reference: provider_reference.clone(),
                metadata: serde_json::json!({
                    "client_ip": request.client_ip,
                    "locale": request.locale,
                    "bank_code": request.bank_code,
                }),
            })
            .await?;

        let params = ProviderCheckoutParams {
            invoice_id: invoice.id.clone(),
            amount: invoice.total_amount,
            locale: request.locale,
            bank_code: request.bank_code,
            client_ip: request.client_ip,
            return_url: request.return_url,
            order_info: format!("EV invoice {}", invoice.id),
        };

        let checkout = match provider.create_checkout(&params, &provider_reference).await {
            Ok(checkout) => checkout,
            Err(e) => {
                // The intent was persisted before the provider round trip;
                // without this it would stay pending forever.
                self.store
                    .mark_intent_status(intent.id, IntentStatus::Failed)
                    .await?;
                return Err(e);
            }
        };

        info!(
            invoice_id = %invoice.id,
            provider = %request.provider,
            intent_id = %intent.id,
            reference = %checkout.reference,
            "checkout initiated"
        );

        Ok(CheckoutOutcome::Redirect {
            redirect_url: checkout.redirect_url,
            intent_id: intent.id,
            reference: checkout.reference,
        })
    }
}
