// Application context.
//
// Holds the fully-initialized configuration for request processing, shared
// across all handlers as `Arc<AppContext>`.

use std::sync::Arc;

use snipstash_billing::checkout::{CheckoutProvider, HostedCheckout};
use snipstash_billing::config::BillingOptions;
use snipstash_core::logger::AppLogger;
use snipstash_core::options::AppOptions;

use crate::identity::{IdentityProvider, StaticTokens};
use crate::store::Store;

/// The fully-initialized application context.
///
/// Created once at startup from `AppOptions` + `BillingOptions` + a [`Store`].
/// Passed to route handlers as `Arc<AppContext>`.
pub struct AppContext {
    /// The original configuration options.
    pub options: AppOptions,

    /// Application name for branding (default: "Snipstash").
    pub app_name: String,

    /// The public base URL for this deployment.
    pub base_url: Option<String>,

    /// The path prefix API routes are mounted under (e.g., "/api").
    pub base_path: String,

    /// Billing provider configuration (secrets, the PRO price id).
    pub billing: BillingOptions,

    /// The typed store for all persistence.
    pub store: Arc<dyn Store>,

    /// Resolves bearer tokens to caller identities.
    pub identity: Arc<dyn IdentityProvider>,

    /// Creates hosted checkout sessions.
    pub checkout: Arc<dyn CheckoutProvider>,

    /// Structured logger with level filtering and ANSI formatting.
    pub logger: AppLogger,
}

// Manual Debug impl because dyn Store is not Debug and the billing
// configuration carries secrets
impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("app_name", &self.app_name)
            .field("base_url", &self.base_url)
            .field("base_path", &self.base_path)
            .field("billing_secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("pro_price_id", &self.billing.pro_price_id)
            .field("logger", &self.logger)
            .finish()
    }
}

impl AppContext {
    /// Create a new `AppContext` from options, billing config, and a store.
    ///
    /// The identity provider defaults to an empty token table, so every
    /// bearer token is rejected until a real provider is supplied via
    /// [`AppContext::with_providers`]. Checkout defaults to the hosted
    /// payment page.
    pub fn new(options: AppOptions, billing: BillingOptions, store: Arc<dyn Store>) -> Arc<Self> {
        Self::with_providers(
            options,
            billing,
            store,
            Arc::new(StaticTokens::default()),
            Arc::new(HostedCheckout::new("https://pay.snipstash.dev")),
        )
    }

    /// Create a new `AppContext` with explicit identity and checkout
    /// providers.
    pub fn with_providers(
        options: AppOptions,
        billing: BillingOptions,
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        checkout: Arc<dyn CheckoutProvider>,
    ) -> Arc<Self> {
        let app_name = options.app_name.clone();
        let base_url = options.base_url.clone();
        let base_path = options.base_path.clone();
        let logger = AppLogger::new(options.logger.clone());

        Arc::new(Self {
            options,
            app_name,
            base_url,
            base_path,
            billing,
            store,
            identity,
            checkout,
            logger,
        })
    }
}
