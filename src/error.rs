//! Error types for the payment and settlement subsystem.
//!
//! The taxonomy separates protocol-level failures (bad signatures, which may
//! indicate forgery attempts) from business rejections (void invoice, unknown
//! invoice) and from persistence failures (retryable, reported to the
//! provider so it redelivers the notification).

use crate::database::error::DatabaseError;
use crate::payments::types::Provider;

/// Result alias used across the payment subsystem.
pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Inbound callback MAC did not match the recomputed value.
    ///
    /// Logged with the offending payload; answered with the provider's
    /// "invalid signature" code. Never treated as a payment outcome.
    #[error("invalid signature on {provider} callback")]
    InvalidSignature { provider: Provider },

    /// A field required by a signing scheme was absent from the input.
    /// This is a programmer error, not a runtime condition to paper over.
    #[error("missing required field `{0}` for signing")]
    MissingField(&'static str),

    /// Provider order reference did not match the `INV_<id>_<token>` format.
    #[error("malformed provider reference `{0}`")]
    MalformedReference(String),

    /// The reference decoded to an invoice id that does not exist.
    #[error("unknown invoice `{0}`")]
    UnknownInvoice(String),

    /// The invoice is void; no payment may be initiated or settled for it.
    #[error("invoice `{0}` is void")]
    InvoiceVoid(String),

    /// Callback amount does not match the invoice total.
    #[error("amount mismatch for invoice `{invoice_id}`: expected {expected}, got {got}")]
    AmountMismatch {
        invoice_id: String,
        expected: i64,
        got: i64,
    },

    /// The provider's API answered with an error or an unparseable body.
    #[error("{provider} API error: {message}")]
    Provider { provider: Provider, message: String },

    /// Transport-level failure talking to the provider.
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    /// Operation exists in the provider protocol but is not supported here.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl PaymentError {
    /// Whether the provider should redeliver the callback that hit this
    /// error. Only persistence problems qualify; signature and business
    /// rejections are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Database(e) => e.is_retryable(),
            PaymentError::Transport { .. } => true,
            _ => false,
        }
    }
}
