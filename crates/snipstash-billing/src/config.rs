//! Billing configuration.

use serde::{Deserialize, Serialize};

use snipstash_core::plan::PlanType;

/// Billing provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingOptions {
    /// Provider secret API key.
    pub secret_key: String,
    /// Webhook signing secret. Falls back to the
    /// `SNIPSTASH_WEBHOOK_SECRET` environment variable when omitted.
    #[serde(default = "webhook_secret_from_env")]
    pub webhook_secret: String,
    /// Price id that maps to the PRO plan. Everything else resolves to FREE.
    pub pro_price_id: String,
    /// Success URL for checkout.
    #[serde(default = "default_success_url")]
    pub default_success_url: String,
    /// Cancel URL for checkout.
    #[serde(default = "default_cancel_url")]
    pub default_cancel_url: String,
}

fn webhook_secret_from_env() -> String {
    snipstash_core::env::get_webhook_secret_from_env().unwrap_or_default()
}

fn default_success_url() -> String {
    "/billing/success".to_string()
}

fn default_cancel_url() -> String {
    "/billing/cancel".to_string()
}

impl BillingOptions {
    pub fn new(
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        pro_price_id: impl Into<String>,
    ) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
            pro_price_id: pro_price_id.into(),
            default_success_url: default_success_url(),
            default_cancel_url: default_cancel_url(),
        }
    }

    /// Resolve the plan tier for a provider price id.
    pub fn plan_for_price(&self, price_id: Option<&str>) -> PlanType {
        match price_id {
            Some(p) if !self.pro_price_id.is_empty() && p == self.pro_price_id => PlanType::Pro,
            _ => PlanType::Free,
        }
    }
}
