//! Shared types for the payment subsystem.
//!
//! Common request/outcome types used by the checkout service, the provider
//! clients and the settlement recorder.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::payment_repository::PaymentStatus;

/// Supported payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Vnpay,
    Zalopay,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Vnpay => "vnpay",
            Provider::Zalopay => "zalopay",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vnpay" => Ok(Provider::Vnpay),
            "zalopay" => Ok(Provider::Zalopay),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Request to initiate a checkout for an invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// Invoice to collect payment for.
    pub invoice_id: String,
    /// Provider to route the payer through.
    pub provider: Provider,
    /// Amount in minor units, as computed by the invoicing subsystem.
    /// Must match the invoice total.
    pub amount: i64,
    /// ISO currency code; only VND flows are supported.
    pub currency: String,
    /// Checkout page locale ("vn" or "en").
    pub locale: String,
    /// Optional bank-code hint forwarded to the provider.
    pub bank_code: Option<String>,
    /// IP address of the paying client.
    pub client_ip: String,
    /// URL the provider redirects the payer back to.
    pub return_url: String,
}

/// Parameters handed to a provider to build its "create payment" call.
#[derive(Debug, Clone)]
pub struct ProviderCheckoutParams {
    pub invoice_id: String,
    pub amount: i64,
    pub locale: String,
    pub bank_code: Option<String>,
    pub client_ip: String,
    pub return_url: String,
    pub order_info: String,
}

/// A fully prepared checkout at the provider side.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderCheckout {
    /// URL the payer is redirected to.
    pub redirect_url: String,
    /// Provider-visible order reference (see `payments::reference`).
    pub reference: String,
}

/// Outcome of a checkout initiation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Redirect the payer to the provider.
    Redirect {
        redirect_url: String,
        intent_id: Uuid,
        reference: String,
    },
    /// The invoice is already settled; initiation is an idempotent no-op.
    AlreadyPaid { invoice_id: String },
}

/// Business fields parsed out of a signature-verified provider callback.
///
/// Only constructed after the MAC check has passed; anything downstream of
/// this type may trust the field values.
#[derive(Debug, Clone)]
pub struct VerifiedCallback {
    pub provider: Provider,
    /// Provider-assigned transaction id, globally unique per provider.
    /// Forms the idempotency key together with `provider`.
    pub provider_txn_id: String,
    /// Our order reference, returned verbatim by the provider.
    pub reference: String,
    /// Amount in minor units as reported by the provider.
    pub amount: i64,
    /// Raw provider response/result code.
    pub response_code: String,
    /// Whether the provider reports the payment as succeeded.
    pub success: bool,
    /// Full callback payload, persisted for audit.
    pub raw: serde_json::Value,
}

/// Outcome of recording a verified callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// First sighting of this transaction id; payment recorded as succeeded
    /// and the invoice transitioned to paid.
    Settled { payment_id: Uuid },
    /// First sighting; provider reported failure, recorded as such. The
    /// invoice is left untouched.
    FailureRecorded { payment_id: Uuid },
    /// This transaction id was already recorded, with `status` as its
    /// original outcome. Expected under at-least-once delivery; nothing
    /// was mutated.
    AlreadyRecorded { status: PaymentStatus },
}
