//! Checkout session creation.

use async_trait::async_trait;
use url::Url;

use snipstash_core::utils::id::generate_id_with_length;

use crate::error::BillingError;
use crate::types::CheckoutSession;

/// Provider-side checkout session creation.
///
/// The payment provider exposes a call that takes a price id and returns a
/// redirect URL. Implementations wrap that call; [`HostedCheckout`] builds the
/// URL locally for development and tests.
#[async_trait]
pub trait CheckoutProvider: Send + Sync + std::fmt::Debug {
    async fn create_checkout_session(
        &self,
        user_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, BillingError>;
}

/// Checkout provider that builds hosted-page URLs without calling out.
#[derive(Debug, Clone)]
pub struct HostedCheckout {
    base_url: String,
}

impl HostedCheckout {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

#[async_trait]
impl CheckoutProvider for HostedCheckout {
    async fn create_checkout_session(
        &self,
        user_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, BillingError> {
        // Longer than row ids so sessions stay unguessable in redirect URLs
        let session_id = format!("cs_{}", generate_id_with_length(32));
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BillingError::Checkout(format!("invalid checkout base URL: {e}")))?;
        url.set_path(&format!("/pay/{}", session_id));
        url.query_pairs_mut()
            .append_pair("priceId", price_id)
            .append_pair("client", user_id)
            .append_pair("successUrl", success_url)
            .append_pair("cancelUrl", cancel_url);
        Ok(CheckoutSession {
            url: url.to_string(),
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hosted_checkout_builds_url() {
        let provider = HostedCheckout::new("https://pay.snipstash.test");
        let session = provider
            .create_checkout_session("user-1", "price_pro", "/ok", "/no")
            .await
            .unwrap();
        assert!(session.url.contains(&session.session_id));
        assert!(session.url.contains("priceId=price_pro"));
        assert!(session.url.contains("client=user-1"));
    }

    #[tokio::test]
    async fn test_hosted_checkout_rejects_bad_base_url() {
        let provider = HostedCheckout::new("not a url");
        let result = provider
            .create_checkout_session("user-1", "price_pro", "/ok", "/no")
            .await;
        assert!(matches!(result, Err(BillingError::Checkout(_))));
    }
}
