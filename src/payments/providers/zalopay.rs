//! ZaloPay integration (create order, callback verification, status query).
//!
//! ZaloPay signs pipe-delimited field strings with HMAC-SHA256. The field
//! subset and order differ per operation, so each one gets its own named
//! mac-data function rather than a generic router. Two keys are in play:
//! key1 signs everything outbound (create, query, refund), key2 verifies
//! inbound callbacks.
//!
//! The `app_trans_id` sent on create must carry a `yymmdd` date prefix
//! computed in UTC+7, regardless of where the server runs.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PaymentError, PaymentResult};
use crate::payments::canonical::pipe_joined;
use crate::payments::signature::{hmac_sha256_hex, verify_hmac_sha256};
use crate::payments::types::{Provider, ProviderCheckoutParams, ProviderCheckout, VerifiedCallback};

/// Return code ZaloPay uses for a successful API call.
pub const RETURN_CODE_SUCCESS: i32 = 1;

/// ZaloPay application configuration. Validated at startup; injected by
/// reference.
#[derive(Debug, Clone)]
pub struct ZalopayConfig {
    /// Application id issued by ZaloPay.
    pub app_id: String,
    /// Key for signing outbound operations.
    pub key1: String,
    /// Key for verifying inbound callbacks.
    pub key2: String,
    /// API endpoint base, e.g. `https://sb-openapi.zalopay.vn/v2`.
    pub endpoint: String,
    /// URL ZaloPay posts callbacks to.
    pub callback_url: String,
    /// Request timeout in seconds for outbound API calls.
    pub timeout_secs: u64,
}

/// Mac data for the create-order operation:
/// `app_id|app_trans_id|app_user|amount|app_time|embed_data|item`.
pub fn create_mac_data(
    app_id: &str,
    app_trans_id: &str,
    app_user: &str,
    amount: &str,
    app_time: &str,
    embed_data: &str,
    item: &str,
) -> String {
    pipe_joined(&[app_id, app_trans_id, app_user, amount, app_time, embed_data, item])
}

/// Mac data for the status-query operation: `app_id|app_trans_id|key1`.
/// ZaloPay folds key1 into the signed string as well as using it as the key.
pub fn query_mac_data(app_id: &str, app_trans_id: &str, key1: &str) -> String {
    pipe_joined(&[app_id, app_trans_id, key1])
}

/// Mac data for the refund operation:
/// `app_id|zp_trans_id|amount|description|timestamp`.
/// Refund execution itself is not supported; the scheme is kept so the
/// signing contract stays documented and tested.
pub fn refund_mac_data(
    app_id: &str,
    zp_trans_id: &str,
    amount: &str,
    description: &str,
    timestamp: &str,
) -> String {
    pipe_joined(&[app_id, zp_trans_id, amount, description, timestamp])
}

/// Mac data for callback verification: the raw `data` string of the
/// callback envelope, signed with key2. Nothing is re-encoded — the MAC
/// covers the exact bytes ZaloPay sent.
pub fn callback_mac_data(data: &str) -> &str {
    data
}

/// Compute the `app_trans_id` for an order reference: `yymmdd_<reference>`,
/// with the date taken in UTC+7.
pub fn app_trans_id(reference: &str, at: DateTime<Utc>) -> String {
    // UTC+7 is fixed by the provider, not by the server's timezone.
    let tz = FixedOffset::east_opt(7 * 3600).expect("UTC+7 is a valid offset");
    format!("{}_{}", at.with_timezone(&tz).format("%y%m%d"), reference)
}

/// Inbound callback envelope: `data` is an opaque JSON string, `mac` is
/// HMAC-SHA256(key2, data).
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    pub data: String,
    pub mac: String,
    #[serde(rename = "type", default)]
    pub event_type: i32,
}

/// Body of the answer returned to ZaloPay's callback calls. Any
/// `return_code` other than 1 makes ZaloPay redeliver, except -1 which
/// tells it the mac was rejected.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResponse {
    pub return_code: i32,
    pub return_message: String,
}

impl CallbackResponse {
    pub fn success() -> Self {
        Self {
            return_code: 1,
            return_message: "success".to_string(),
        }
    }

    pub fn invalid_mac() -> Self {
        Self {
            return_code: -1,
            return_message: "mac not equal".to_string(),
        }
    }

    pub fn retryable_error(message: &str) -> Self {
        Self {
            return_code: 0,
            return_message: message.to_string(),
        }
    }

    /// Permanent rejection: negative codes tell ZaloPay not to redeliver.
    pub fn rejected(message: &str) -> Self {
        Self {
            return_code: -1,
            return_message: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    return_code: i32,
    return_message: String,
    #[serde(default)]
    order_url: Option<String>,
}

/// Fields carried in the callback `data` JSON.
#[derive(Debug, Deserialize)]
struct CallbackData {
    app_trans_id: String,
    zp_trans_id: i64,
    amount: i64,
}

/// ZaloPay provider client.
pub struct ZalopayProvider {
    config: ZalopayConfig,
    client: Client,
}

impl ZalopayProvider {
    pub fn new(config: ZalopayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create a ZaloPay order and return the hosted checkout URL.
    ///
    /// `app_trans_id` is the date-prefixed reference from [`app_trans_id`];
    /// it is what comes back verbatim in callbacks and status queries.
    pub async fn create_order(
        &self,
        params: &ProviderCheckoutParams,
        app_trans_id: &str,
        now: DateTime<Utc>,
    ) -> PaymentResult<ProviderCheckout> {
        let app_time = now.timestamp_millis().to_string();
        let amount = params.amount.to_string();
        let app_user = "evdealer";
        let item = "[]";
        let embed_data = serde_json::json!({
            "redirecturl": params.return_url,
            "invoice_id": params.invoice_id,
        })
        .to_string();

        let mac_data = create_mac_data(
            &self.config.app_id,
            app_trans_id,
            app_user,
            &amount,
            &app_time,
            &embed_data,
            item,
        );
        let mac = hmac_sha256_hex(self.config.key1.as_bytes(), mac_data.as_bytes());

        let body = serde_json::json!({
            "app_id": self.config.app_id,
            "app_user": app_user,
            "app_trans_id": app_trans_id,
            "app_time": app_time,
            "amount": amount,
            "item": item,
            "embed_data": embed_data,
            "description": params.order_info,
            "bank_code": params.bank_code.clone().unwrap_or_default(),
            "callback_url": self.config.callback_url,
            "mac": mac,
        });

        let response = self
            .client
            .post(format!("{}/create", self.config.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Transport {
                provider: Provider::Zalopay,
                source: e,
            })?;

        let parsed: CreateOrderResponse =
            response.json().await.map_err(|e| PaymentError::Provider {
                provider: Provider::Zalopay,
                message: format!("invalid create response: {}", e),
            })?;

        if parsed.return_code != RETURN_CODE_SUCCESS {
            return Err(PaymentError::Provider {
                provider: Provider::Zalopay,
                message: format!(
                    "create order rejected ({}): {}",
                    parsed.return_code, parsed.return_message
                ),
            });
        }

        let redirect_url = parsed.order_url.ok_or_else(|| PaymentError::Provider {
            provider: Provider::Zalopay,
            message: "create response missing order_url".to_string(),
        })?;

        Ok(ProviderCheckout {
            redirect_url,
            reference: app_trans_id.to_string(),
        })
    }

    /// Verify a callback envelope with key2 and extract the business
    /// fields from its `data` payload.
    pub fn verify_callback(&self, envelope: &CallbackEnvelope) -> PaymentResult<VerifiedCallback> {
        if !verify_hmac_sha256(
            self.config.key2.as_bytes(),
            callback_mac_data(&envelope.data).as_bytes(),
            &envelope.mac,
        ) {
            warn!(data = %envelope.data, "zalopay callback mac mismatch");
            return Err(PaymentError::InvalidSignature {
                provider: Provider::Zalopay,
            });
        }

        let data: CallbackData =
            serde_json::from_str(&envelope.data).map_err(|e| PaymentError::Provider {
                provider: Provider::Zalopay,
                message: format!("invalid callback data: {}", e),
            })?;

        Ok(VerifiedCallback {
            provider: Provider::Zalopay,
            provider_txn_id: data.zp_trans_id.to_string(),
            reference: data.app_trans_id,
            amount: data.amount,
            response_code: envelope.event_type.to_string(),
            // ZaloPay only delivers callbacks for completed payments.
            success: true,
            raw: serde_json::json!({
                "data": envelope.data,
                "mac": envelope.mac,
                "type": envelope.event_type,
            }),
        })
    }

    /// Query ZaloPay for the provider-side status of an order.
    pub async fn query_transaction(&self, app_trans_id: &str) -> PaymentResult<serde_json::Value> {
        let mac_data = query_mac_data(&self.config.app_id, app_trans_id, &self.config.key1);
        let mac = hmac_sha256_hex(self.config.key1.as_bytes(), mac_data.as_bytes());

        let body = serde_json::json!({
            "app_id": self.config.app_id,
            "app_trans_id": app_trans_id,
            "mac": mac,
        });

        let response = self
            .client
            .post(format!("{}/query", self.config.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Transport {
                provider: Provider::Zalopay,
                source: e,
            })?;

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| PaymentError::Provider {
                provider: Provider::Zalopay,
                message: format!("invalid query response: {}", e),
            })
    }

    pub fn config(&self) -> &ZalopayConfig {
        &self.config
    }
}
