use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::database;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub database: bool,
    pub providers_configured: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let database = database::health_check(&state.pool).await.is_ok();

    let providers_configured = !state.config.vnpay.tmn_code.is_empty()
        && !state.config.vnpay.hash_secret.is_empty()
        && !state.config.zalopay.app_id.is_empty();

    let status = if database { "healthy" } else { "degraded" };

    let response = HealthResponse {
        status: status.to_string(),
        version,
        environment: state.config.server.environment.clone(),
        database,
        providers_configured,
    };

    Ok(Json(response))
}
