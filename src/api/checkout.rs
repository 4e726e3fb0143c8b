use axum::{extract::State, Json};

use crate::api::AppState;
use crate::error::PaymentError;
use crate::payments::types::{CheckoutOutcome, CheckoutRequest};

/// Initiate a checkout for an invoice and hand back the redirect URL.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutOutcome>, PaymentError> {
    let outcome = state.checkout.start(request).await?;
    Ok(Json(outcome))
}
