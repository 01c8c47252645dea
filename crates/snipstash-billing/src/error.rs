//! Failures raised below the billing routes.

/// What checkout assembly and webhook intake can fail with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    /// Malformed signature header, undecodable payload, or digest mismatch.
    /// Every verification failure collapses into this one variant; the
    /// response never says which check tripped.
    #[error("Webhook signature verification failed")]
    SignatureRejected,

    /// Checkout session assembly failed, with the reason for the route
    /// layer to surface.
    #[error("Failed to create checkout session: {0}")]
    Checkout(String),
}
