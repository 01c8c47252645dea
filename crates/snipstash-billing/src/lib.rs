//! # snipstash-billing
//!
//! Billing provider integration for Snipstash: subscription types, plan
//! resolution from price ids, checkout session creation, and webhook
//! signature verification.
//!
//! ## Endpoints (mounted by snipstash-axum)
//! - POST /checkout — Create a checkout session for a price id
//! - POST /webhooks — Receive billing provider webhook events
//! - GET /subscription — Get the caller's subscription, plan, and usage

pub mod checkout;
pub mod config;
pub mod error;
pub mod types;
pub mod webhook;

pub use checkout::*;
pub use config::*;
pub use error::*;
pub use types::*;
