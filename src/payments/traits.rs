//! Payment provider trait definitions.
//!
//! Each provider implements its own canonicalization and signing strategy
//! (see `providers::vnpay` and `providers::zalopay`); this trait covers the
//! operations the checkout service drives uniformly.

use async_trait::async_trait;
use chrono::{Local, Utc};

use crate::error::{PaymentError, PaymentResult};
use crate::payments::providers::{vnpay::VnpayProvider, zalopay::ZalopayProvider};
use crate::payments::types::{Provider, ProviderCheckout, ProviderCheckoutParams};

/// Uniform interface over the supported payment providers.
///
/// Callback verification is intentionally not part of this trait: the
/// inbound payload shapes differ per provider (query map vs. JSON
/// envelope), so the HTTP layer calls the provider-specific verifiers.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> Provider;

    /// Derive the provider-visible order reference from our internal one.
    /// This is what the provider echoes back in callbacks, so it is
    /// persisted on the intent before any provider round trip.
    fn prepare_reference(&self, reference: &str) -> String;

    /// Prepare a checkout at the provider and return the redirect URL.
    /// `provider_reference` must come from [`Self::prepare_reference`].
    async fn create_checkout(
        &self,
        params: &ProviderCheckoutParams,
        provider_reference: &str,
    ) -> PaymentResult<ProviderCheckout>;

    /// Query the provider-side status of a transaction for reconciliation.
    async fn query_transaction(&self, reference: &str) -> PaymentResult<serde_json::Value>;

    /// Refund a settled transaction. Not supported by this deployment;
    /// both implementations return a typed `Unsupported` error.
    async fn refund(&self, provider_txn_id: &str, amount: i64) -> PaymentResult<()>;
}

#[async_trait]
impl PaymentProvider for VnpayProvider {
    fn name(&self) -> Provider {
        Provider::Vnpay
    }

    fn prepare_reference(&self, reference: &str) -> String {
        // VNPay takes the reference as-is in vnp_TxnRef.
        reference.to_string()
    }

    async fn create_checkout(
        &self,
        params: &ProviderCheckoutParams,
        provider_reference: &str,
    ) -> PaymentResult<ProviderCheckout> {
        // VNPay checkouts are a signed redirect URL; no provider round trip.
        let redirect_url = self.build_pay_url(params, provider_reference, Local::now());
        Ok(ProviderCheckout {
            redirect_url,
            reference: provider_reference.to_string(),
        })
    }

    async fn query_transaction(&self, reference: &str) -> PaymentResult<serde_json::Value> {
        VnpayProvider::query_transaction(self, reference, Local::now()).await
    }

    async fn refund(&self, _provider_txn_id: &str, _amount: i64) -> PaymentResult<()> {
        Err(PaymentError::Unsupported("vnpay refund"))
    }
}

#[async_trait]
impl PaymentProvider for ZalopayProvider {
    fn name(&self) -> Provider {
        Provider::Zalopay
    }

    fn prepare_reference(&self, reference: &str) -> String {
        crate::payments::providers::zalopay::app_trans_id(reference, Utc::now())
    }

    async fn create_checkout(
        &self,
        params: &ProviderCheckoutParams,
        provider_reference: &str,
    ) -> PaymentResult<ProviderCheckout> {
        self.create_order(params, provider_reference, Utc::now()).await
    }

    async fn query_transaction(&self, reference: &str) -> PaymentResult<serde_json::Value> {
        ZalopayProvider::query_transaction(self, reference).await
    }

    async fn refund(&self, _provider_txn_id: &str, _amount: i64) -> PaymentResult<()> {
        Err(PaymentError::Unsupported("zalopay refund"))
    }
}
