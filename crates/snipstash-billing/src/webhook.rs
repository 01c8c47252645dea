//! Webhook signature verification and event parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::BillingError;
use crate::types::*;

type HmacSha256 = Hmac<Sha256>;

/// Verify a provider webhook signature.
///
/// The signature header carries `t=<unix seconds>,v1=<hex digest>`; the
/// digest is HMAC-SHA256 over `<t>.<raw body>` keyed by the endpoint secret.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), BillingError> {
    let (timestamp, signature) =
        signature_parts(signature_header).ok_or(BillingError::SignatureRejected)?;

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| BillingError::SignatureRejected)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if bool::from(subtle::ConstantTimeEq::ct_eq(
        expected.as_bytes(),
        signature.as_bytes(),
    )) {
        Ok(())
    } else {
        Err(BillingError::SignatureRejected)
    }
}

/// Split `t=...,v1=...` into its two required fields, accepted in any order.
/// Unknown fields are skipped so the provider can add scheme versions.
fn signature_parts(header: &str) -> Option<(&str, &str)> {
    let mut timestamp = None;
    let mut signature = None;
    for field in header.split(',') {
        match field.split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    timestamp.zip(signature)
}

/// Supported webhook event types.
pub const SUPPORTED_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
    "invoice.payment_succeeded",
    "invoice.payment_failed",
];

/// Check if a webhook event type is supported.
pub fn is_supported_event(event_type: &str) -> bool {
    SUPPORTED_EVENTS.contains(&event_type)
}

/// Classify a provider event type into the reconciliation action it drives.
/// Returns `None` for unrecognized types; callers log and ignore those.
pub fn classify_event(event_type: &str) -> Option<BillingEvent> {
    match event_type {
        "checkout.session.completed" => Some(BillingEvent::SubscriptionLink),
        "customer.subscription.created" => Some(BillingEvent::SubscriptionCreated),
        "customer.subscription.updated" => Some(BillingEvent::SubscriptionUpdated),
        "customer.subscription.deleted" => Some(BillingEvent::SubscriptionDeleted),
        "invoice.payment_succeeded" => Some(BillingEvent::PaymentSucceeded),
        "invoice.payment_failed" => Some(BillingEvent::PaymentFailed),
        _ => None,
    }
}

/// Parse subscription status from a provider subscription object.
pub fn parse_subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "canceled" => SubscriptionStatus::Canceled,
        "past_due" => SubscriptionStatus::PastDue,
        "unpaid" => SubscriptionStatus::Unpaid,
        _ => SubscriptionStatus::Incomplete,
    }
}

/// Pull the reconciliation fields out of a checkout session object.
/// The user is identified by `metadata.userId`, falling back to
/// `client_reference_id`.
pub fn extract_checkout_session(object: &serde_json::Value) -> CheckoutCompleted {
    let user_id = object["metadata"]["userId"]
        .as_str()
        .or_else(|| object["client_reference_id"].as_str())
        .map(|s| s.to_string());
    CheckoutCompleted {
        user_id,
        customer_id: object["customer"].as_str().map(|s| s.to_string()),
        subscription_id: object["subscription"].as_str().map(|s| s.to_string()),
    }
}

/// Pull the reconciliation fields out of a provider subscription object.
/// Period bounds arrive as unix seconds and are converted to RFC 3339.
pub fn extract_subscription_update(object: &serde_json::Value) -> SubscriptionUpdate {
    let price_id = object["items"]["data"][0]["price"]["id"]
        .as_str()
        .map(|s| s.to_string());
    SubscriptionUpdate {
        subscription_id: object["id"].as_str().map(|s| s.to_string()),
        customer_id: object["customer"].as_str().map(|s| s.to_string()),
        price_id,
        status: parse_subscription_status(object["status"].as_str().unwrap_or("")),
        current_period_start: object["current_period_start"].as_i64().and_then(unix_to_rfc3339),
        current_period_end: object["current_period_end"].as_i64().and_then(unix_to_rfc3339),
        cancel_at_period_end: object["cancel_at_period_end"].as_bool().unwrap_or(false),
    }
}

/// Pull the subscription/customer ids out of an invoice object.
pub fn extract_invoice(object: &serde_json::Value) -> InvoiceInfo {
    InvoiceInfo {
        customer_id: object["customer"].as_str().map(|s| s.to_string()),
        subscription_id: object["subscription"].as_str().map(|s| s.to_string()),
    }
}

fn unix_to_rfc3339(secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
}
