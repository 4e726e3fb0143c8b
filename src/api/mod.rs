//! HTTP surface: thin pass-through routing into the payment subsystem.

pub mod callbacks;
pub mod checkout;
pub mod health;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::PaymentError;
use crate::payments::checkout::CheckoutService;
use crate::payments::providers::{vnpay::VnpayProvider, zalopay::ZalopayProvider};
use crate::settlement::SettlementRecorder;

/// Shared application state for the axum router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub checkout: Arc<CheckoutService>,
    pub recorder: Arc<SettlementRecorder>,
    pub vnpay: Arc<VnpayProvider>,
    pub zalopay: Arc<ZalopayProvider>,
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = match &self {
            PaymentError::UnknownInvoice(_) => StatusCode::NOT_FOUND,
            PaymentError::InvoiceVoid(_)
            | PaymentError::AmountMismatch { .. }
            | PaymentError::MalformedReference(_)
            | PaymentError::Unsupported(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::InvalidSignature { .. } => StatusCode::BAD_REQUEST,
            PaymentError::MissingField(_) => StatusCode::BAD_REQUEST,
            PaymentError::Provider { .. } | PaymentError::Transport { .. } => {
                StatusCode::BAD_GATEWAY
            }
            PaymentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
