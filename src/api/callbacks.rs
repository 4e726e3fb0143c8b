//! Inbound provider callbacks.
//!
//! The browser return path is display-only: a verified "00" there tells
//! the payer the provider reported success, but the invoice is settled
//! exclusively by the server-to-server notification. Both notification
//! handlers answer HTTP 200 with the provider's own result vocabulary so
//! the provider knows whether to stop redelivering.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::error::PaymentError;
use crate::payments::providers::vnpay::IpnResponse;
use crate::payments::providers::zalopay::{CallbackEnvelope, CallbackResponse};
use crate::payments::reference;
use crate::payments::types::SettlementOutcome;

/// What the browser return page gets to show the payer.
#[derive(Debug, Serialize)]
pub struct ReturnView {
    pub verified: bool,
    pub success: bool,
    pub response_code: String,
    pub invoice_id: Option<String>,
    /// Always true: settlement is confirmed only by the IPN, which may
    /// land after the payer is redirected back.
    pub provisional: bool,
}

/// VNPay browser return. Verified, but never a settlement trigger.
pub async fn vnpay_return(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<ReturnView> {
    match state.vnpay.verify_callback(&params) {
        Ok(callback) => Json(ReturnView {
            verified: true,
            success: callback.success,
            response_code: callback.response_code,
            invoice_id: reference::decode_invoice_id(&callback.reference).ok(),
            provisional: true,
        }),
        Err(e) => {
            warn!(error = %e, "vnpay return rejected");
            Json(ReturnView {
                verified: false,
                success: false,
                response_code: String::new(),
                invoice_id: None,
                provisional: true,
            })
        }
    }
}

/// VNPay IPN: the authoritative settlement source.
pub async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<IpnResponse> {
    let callback = match state.vnpay.verify_callback(&params) {
        Ok(callback) => callback,
        Err(PaymentError::InvalidSignature { .. }) => {
            return Json(IpnResponse::invalid_signature());
        }
        Err(e) => {
            warn!(error = %e, "vnpay ipn payload rejected");
            return Json(IpnResponse::internal_error());
        }
    };

    match state.recorder.record(&callback).await {
        Ok(SettlementOutcome::Settled { .. }) | Ok(SettlementOutcome::FailureRecorded { .. }) => {
            Json(IpnResponse::ok())
        }
        Ok(SettlementOutcome::AlreadyRecorded { .. }) => Json(IpnResponse::already_confirmed()),
        Err(PaymentError::MalformedReference(_)) | Err(PaymentError::UnknownInvoice(_)) => {
            Json(IpnResponse::order_not_found())
        }
        Err(PaymentError::AmountMismatch { .. }) => Json(IpnResponse::invalid_amount()),
        Err(e) => {
            // Retryable from the provider's point of view: we must not
            // acknowledge success unless the payment row is durable.
            error!(error = %e, "vnpay ipn settlement failed");
            Json(IpnResponse::internal_error())
        }
    }
}

/// ZaloPay server-to-server callback.
pub async fn zalopay_callback(
    State(state): State<AppState>,
    Json(envelope): Json<CallbackEnvelope>,
) -> Json<CallbackResponse> {
    let callback = match state.zalopay.verify_callback(&envelope) {
        Ok(callback) => callback,
        Err(PaymentError::InvalidSignature { .. }) => {
            return Json(CallbackResponse::invalid_mac());
        }
        Err(e) => {
            warn!(error = %e, "zalopay callback payload rejected");
            return Json(CallbackResponse::retryable_error("invalid callback data"));
        }
    };

    match state.recorder.record(&callback).await {
        Ok(outcome) => {
            info!(?outcome, "zalopay callback recorded");
            Json(CallbackResponse::success())
        }
        // Persistence or transport trouble: the payment row may not be
        // durable, so ask for redelivery rather than acknowledging.
        Err(e @ PaymentError::Database(_)) | Err(e @ PaymentError::Transport { .. }) => {
            error!(error = %e, "zalopay settlement failed, asking for redelivery");
            Json(CallbackResponse::retryable_error("settlement not durable"))
        }
        Err(e) => {
            warn!(error = %e, "zalopay callback rejected");
            Json(CallbackResponse::rejected(&e.to_string()))
        }
    }
}
