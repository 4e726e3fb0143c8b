//! VNPay integration (redirect checkout, return/IPN verification, status
//! query).
//!
//! VNPay signs the sorted, percent-encoded query string with HMAC-SHA512
//! under a single merchant secret. The same canonical form is used for
//! request creation and for callback verification; the inbound
//! `vnp_SecureHash`/`vnp_SecureHashType` fields are stripped before
//! canonicalization since they are never part of their own input.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;
use tracing::warn;

use crate::error::{PaymentError, PaymentResult};
use crate::payments::canonical::sorted_query;
use crate::payments::signature::{hmac_sha512_hex, verify_hmac_sha512};
use crate::payments::types::{Provider, ProviderCheckoutParams, VerifiedCallback};

pub const SECURE_HASH_FIELD: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE_FIELD: &str = "vnp_SecureHashType";

/// Response code VNPay uses for a successful payment.
pub const RESPONSE_CODE_SUCCESS: &str = "00";

/// VNPay merchant configuration. Validated at startup (see `config`);
/// injected by reference, never read from the environment at call time.
#[derive(Debug, Clone)]
pub struct VnpayConfig {
    /// Merchant terminal code issued by VNPay.
    pub tmn_code: String,
    /// Shared HMAC-SHA512 secret, used for all operations.
    pub hash_secret: String,
    /// Hosted checkout page the payer is redirected to.
    pub pay_url: String,
    /// Merchant API endpoint for transaction status queries.
    pub api_url: String,
    /// Request timeout in seconds for outbound API calls.
    pub timeout_secs: u64,
}

/// VNPay provider client.
pub struct VnpayProvider {
    config: VnpayConfig,
    client: Client,
}

impl VnpayProvider {
    pub fn new(config: VnpayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Build the signed redirect URL for a checkout.
    ///
    /// `created_at` is the merchant-local creation time; VNPay expects it
    /// as a `yyyyMMddHHmmss` string.
    pub fn build_pay_url(
        &self,
        params: &ProviderCheckoutParams,
        reference: &str,
        created_at: DateTime<Local>,
    ) -> String {
        let amount = (params.amount * 100).to_string();
        let create_date = created_at.format("%Y%m%d%H%M%S").to_string();

        let mut fields: Vec<(&str, &str)> = vec![
            ("vnp_Version", "2.1.0"),
            ("vnp_Command", "pay"),
            ("vnp_TmnCode", &self.config.tmn_code),
            ("vnp_Amount", &amount),
            ("vnp_CurrCode", "VND"),
            ("vnp_TxnRef", reference),
            ("vnp_OrderInfo", &params.order_info),
            ("vnp_OrderType", "other"),
            ("vnp_Locale", &params.locale),
            ("vnp_ReturnUrl", &params.return_url),
            ("vnp_IpAddr", &params.client_ip),
            ("vnp_CreateDate", &create_date),
        ];
        if let Some(bank_code) = params.bank_code.as_deref() {
            fields.push(("vnp_BankCode", bank_code));
        }

        let canonical = sorted_query(fields);
        let signature = hmac_sha512_hex(self.config.hash_secret.as_bytes(), canonical.as_bytes());

        format!(
            "{}?{}&{}={}",
            self.config.pay_url, canonical, SECURE_HASH_FIELD, signature
        )
    }

    /// Verify an inbound return or IPN parameter map and extract the
    /// business fields.
    ///
    /// A MAC mismatch is a protocol-level rejection: it is logged with the
    /// payload for audit and must never reach the settlement recorder.
    pub fn verify_callback(
        &self,
        raw: &HashMap<String, String>,
    ) -> PaymentResult<VerifiedCallback> {
        let fields = raw
            .iter()
            .filter(|(k, _)| k.as_str() != SECURE_HASH_FIELD && k.as_str() != SECURE_HASH_TYPE_FIELD)
            .map(|(k, v)| (k.as_str(), v.as_str()));

        let received = raw.get(SECURE_HASH_FIELD).map(String::as_str).unwrap_or("");
        let canonical = sorted_query(fields);

        if !verify_hmac_sha512(
            self.config.hash_secret.as_bytes(),
            canonical.as_bytes(),
            received,
        ) {
            warn!(payload = ?raw, "vnpay callback signature mismatch");
            return Err(PaymentError::InvalidSignature {
                provider: Provider::Vnpay,
            });
        }

        let response_code = require(raw, "vnp_ResponseCode")?;
        let reference = require(raw, "vnp_TxnRef")?;
        let provider_txn_id = require(raw, "vnp_TransactionNo")?;
        let amount: i64 = require(raw, "vnp_Amount")?
            .parse()
            .map_err(|_| PaymentError::Provider {
                provider: Provider::Vnpay,
                message: "vnp_Amount is not an integer".to_string(),
            })?;
        // VNPay amounts are always the invoice amount multiplied by 100;
        // anything else is malformed, not a smaller payment.
        if amount % 100 != 0 {
            return Err(PaymentError::Provider {
                provider: Provider::Vnpay,
                message: "vnp_Amount is not a multiple of 100".to_string(),
            });
        }

        Ok(VerifiedCallback {
            provider: Provider::Vnpay,
            provider_txn_id: provider_txn_id.to_string(),
            reference: reference.to_string(),
            // VNPay reports amounts multiplied by 100.
            amount: amount / 100,
            response_code: response_code.to_string(),
            success: response_code == RESPONSE_CODE_SUCCESS,
            raw: serde_json::to_value(raw).unwrap_or_default(),
        })
    }

    /// Query VNPay for the provider-side status of a transaction.
    pub async fn query_transaction(
        &self,
        reference: &str,
        created_at: DateTime<Local>,
    ) -> PaymentResult<serde_json::Value> {
        let create_date = created_at.format("%Y%m%d%H%M%S").to_string();
        let order_info = format!("Query transaction {}", reference);

        let fields: Vec<(&str, &str)> = vec![
            ("vnp_Version", "2.1.0"),
            ("vnp_Command", "querydr"),
            ("vnp_TmnCode", &self.config.tmn_code),
            ("vnp_TxnRef", reference),
            ("vnp_OrderInfo", &order_info),
            ("vnp_CreateDate", &create_date),
        ];

        let canonical = sorted_query(fields);
        let signature = hmac_sha512_hex(self.config.hash_secret.as_bytes(), canonical.as_bytes());
        let url = format!(
            "{}?{}&{}={}",
            self.config.api_url, canonical, SECURE_HASH_FIELD, signature
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PaymentError::Transport {
                provider: Provider::Vnpay,
                source: e,
            })?;

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| PaymentError::Provider {
                provider: Provider::Vnpay,
                message: format!("invalid query response: {}", e),
            })
    }

    pub fn config(&self) -> &VnpayConfig {
        &self.config
    }
}

fn require<'a>(
    map: &'a HashMap<String, String>,
    key: &'static str,
) -> PaymentResult<&'a str> {
    map.get(key)
        .map(String::as_str)
        .ok_or(PaymentError::MissingField(key))
}

/// Body of the answer returned to VNPay's IPN calls.
///
/// The code vocabulary is fixed by the provider: anything other than "00"
/// makes VNPay redeliver the notification.
#[derive(Debug, Clone, Serialize)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnResponse {
    fn new(rsp_code: &str, message: &str) -> Self {
        Self {
            rsp_code: rsp_code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn ok() -> Self {
        Self::new("00", "Confirm Success")
    }

    pub fn order_not_found() -> Self {
        Self::new("01", "Order not found")
    }

    pub fn already_confirmed() -> Self {
        Self::new("02", "Order already confirmed")
    }

    pub fn invalid_amount() -> Self {
        Self::new("04", "Invalid amount")
    }

    pub fn invalid_signature() -> Self {
        Self::new("97", "Invalid signature")
    }

    pub fn internal_error() -> Self {
        Self::new("99", "Internal error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_provider() -> VnpayProvider {
        VnpayProvider::new(VnpayConfig {
            tmn_code: "EVDEMO01".to_string(),
            hash_secret: "topsecretvnpaykey".to_string(),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
            api_url: "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction".to_string(),
            timeout_secs: 30,
        })
    }

    fn created_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 31, 14, 5, 9).unwrap()
    }

    fn checkout_params() -> ProviderCheckoutParams {
        ProviderCheckoutParams {
            invoice_id: "INV-42".to_string(),
            amount: 150_000,
            locale: "vn".to_string(),
            bank_code: None,
            client_ip: "203.0.113.7".to_string(),
            return_url: "https://dealer.example.vn/payments/return".to_string(),
            order_info: "EV deposit INV-42".to_string(),
        }
    }

    /// Build a callback map signed the way VNPay would sign it.
    fn signed_callback(provider: &VnpayProvider, overrides: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = [
            ("vnp_TmnCode", "EVDEMO01"),
            ("vnp_Amount", "15000000"),
            ("vnp_TxnRef", "INV_INV-42_1706686509000abc123"),
            ("vnp_TransactionNo", "TX-1"),
            ("vnp_ResponseCode", "00"),
            ("vnp_PayDate", "20240131141000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in overrides {
            map.insert(k.to_string(), v.to_string());
        }

        let canonical = sorted_query(map.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let signature =
            hmac_sha512_hex(provider.config.hash_secret.as_bytes(), canonical.as_bytes());
        map.insert(SECURE_HASH_FIELD.to_string(), signature);
        map
    }

    #[test]
    fn pay_url_is_signed_and_sorted() {
        let provider = test_provider();
        let url = provider.build_pay_url(&checkout_params(), "INV_INV-42_1706686509000abc123", created_at());

        assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
        // ×100 amount, yyyyMMddHHmmss create date, trailing signature.
        assert!(url.contains("vnp_Amount=15000000"));
        assert!(url.contains("vnp_CreateDate=20240131140509"));
        assert!(url.contains("vnp_CurrCode=VND"));
        assert!(url.contains("&vnp_SecureHash="));

        let query = url.split_once('?').unwrap().1;
        let keys: Vec<&str> = query
            .split('&')
            .map(|pair| pair.split_once('=').unwrap().0)
            .collect();
        let mut sorted = keys[..keys.len() - 1].to_vec();
        sorted.sort_unstable();
        assert_eq!(keys[..keys.len() - 1], sorted[..]);
        assert_eq!(*keys.last().unwrap(), SECURE_HASH_FIELD);
    }

    #[test]
    fn bank_code_hint_is_included_when_present() {
        let provider = test_provider();
        let mut params = checkout_params();
        params.bank_code = Some("NCB".to_string());
        let url = provider.build_pay_url(&params, "INV_INV-42_1x", created_at());
        assert!(url.contains("vnp_BankCode=NCB"));
    }

    #[test]
    fn verify_accepts_correctly_signed_callback() {
        let provider = test_provider();
        let map = signed_callback(&provider, &[]);

        let cb = provider.verify_callback(&map).unwrap();
        assert_eq!(cb.provider, Provider::Vnpay);
        assert_eq!(cb.provider_txn_id, "TX-1");
        assert_eq!(cb.reference, "INV_INV-42_1706686509000abc123");
        assert_eq!(cb.amount, 150_000);
        assert!(cb.success);
    }

    #[test]
    fn verify_rejects_tampered_amount() {
        let provider = test_provider();
        let mut map = signed_callback(&provider, &[]);
        // Signature was computed over the original amount.
        map.insert("vnp_Amount".to_string(), "100".to_string());

        assert!(matches!(
            provider.verify_callback(&map),
            Err(PaymentError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn verify_rejects_missing_signature() {
        let provider = test_provider();
        let mut map = signed_callback(&provider, &[]);
        map.remove(SECURE_HASH_FIELD);

        assert!(matches!(
            provider.verify_callback(&map),
            Err(PaymentError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn verify_ignores_hash_type_field() {
        let provider = test_provider();
        let mut map = signed_callback(&provider, &[]);
        // Some VNPay flows echo the algorithm tag; it is never signed.
        map.insert(SECURE_HASH_TYPE_FIELD.to_string(), "HmacSHA512".to_string());

        assert!(provider.verify_callback(&map).is_ok());
    }

    #[test]
    fn verify_rejects_amount_not_multiple_of_100() {
        let provider = test_provider();
        // Correctly signed, but the value breaks the ×100 contract.
        let map = signed_callback(&provider, &[("vnp_Amount", "15000050")]);

        assert!(matches!(
            provider.verify_callback(&map),
            Err(PaymentError::Provider { .. })
        ));
    }

    #[test]
    fn failed_payment_code_is_not_success() {
        let provider = test_provider();
        let map = signed_callback(&provider, &[("vnp_ResponseCode", "24")]);

        let cb = provider.verify_callback(&map).unwrap();
        assert!(!cb.success);
        assert_eq!(cb.response_code, "24");
    }
}
