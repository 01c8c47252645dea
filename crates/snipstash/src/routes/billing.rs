// Billing route handlers: checkout session creation, the subscription
// summary, and webhook reconciliation.
//
// Reconciliation is deliberately forgiving. Webhook delivery is
// at-least-once and unordered, so every arm is written as an absolute
// "set state to X" rather than a transition, and events that cannot be
// matched to a local row are logged and dropped. Returning an error from
// the webhook path would make the provider retry an event we will never
// be able to apply.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use snipstash_billing::types::{
    CheckoutCompleted, CreateCheckoutRequest, SubscriptionStatus, SubscriptionUpdate,
    UserSubscription, WebhookEvent,
};
use snipstash_billing::webhook::{
    classify_event, extract_checkout_session, extract_invoice, extract_subscription_update,
};
use snipstash_billing::BillingEvent;
use snipstash_core::error::{ApiError, ErrorCode, HttpStatus};
use snipstash_core::plan::{PlanLimits, PlanType};
use snipstash_core::utils::generate_id;

use crate::context::AppContext;
use crate::quota::{self, Usage};
use crate::store::StoreError;

/// Error type for billing route handlers.
#[derive(Debug)]
pub enum BillingRouteError {
    MissingPriceId,
    CheckoutFailed(String),
    Store(StoreError),
}

impl From<StoreError> for BillingRouteError {
    fn from(e: StoreError) -> Self {
        BillingRouteError::Store(e)
    }
}

impl std::fmt::Display for BillingRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingRouteError::MissingPriceId => write!(f, "Price id is required"),
            BillingRouteError::CheckoutFailed(msg) => write!(f, "Checkout failed: {}", msg),
            BillingRouteError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl From<BillingRouteError> for ApiError {
    fn from(e: BillingRouteError) -> Self {
        match e {
            BillingRouteError::MissingPriceId => ApiError::bad_request(ErrorCode::MissingPriceId),
            BillingRouteError::CheckoutFailed(msg) => ApiError::with_message(
                HttpStatus::InternalServerError,
                ErrorCode::FailedToCreateCheckoutSession,
                msg,
            ),
            BillingRouteError::Store(StoreError::NotFound) => {
                ApiError::not_found(ErrorCode::SubscriptionNotFound)
            }
            BillingRouteError::Store(_) => ApiError::internal(ErrorCode::InternalServerError),
        }
    }
}

// ── Checkout ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Handle POST /checkout
///
/// Makes sure a subscription row exists for the caller before handing the
/// provider a session, so the webhook that follows always has a row to
/// attach its ids to.
pub async fn handle_create_checkout(
    ctx: &Arc<AppContext>,
    user_id: &str,
    body: CreateCheckoutRequest,
) -> Result<CheckoutResponse, BillingRouteError> {
    let price_id = body.price_id.trim();
    if price_id.is_empty() {
        return Err(BillingRouteError::MissingPriceId);
    }

    ensure_subscription_row(ctx, user_id).await?;

    let success_url = body
        .success_url
        .unwrap_or_else(|| ctx.billing.default_success_url.clone());
    let cancel_url = body
        .cancel_url
        .unwrap_or_else(|| ctx.billing.default_cancel_url.clone());

    let session = ctx
        .checkout
        .create_checkout_session(user_id, price_id, &success_url, &cancel_url)
        .await
        .map_err(|e| BillingRouteError::CheckoutFailed(e.to_string()))?;

    Ok(CheckoutResponse { url: session.url })
}

/// Find or lazily create the caller's subscription row (FREE, incomplete).
async fn ensure_subscription_row(
    ctx: &Arc<AppContext>,
    user_id: &str,
) -> Result<UserSubscription, StoreError> {
    if let Some(existing) = ctx.store.find_subscription_by_user(user_id).await? {
        return Ok(existing);
    }
    ctx.store.create_subscription(&blank_subscription(user_id)).await
}

fn blank_subscription(user_id: &str) -> UserSubscription {
    let now = chrono::Utc::now().to_rfc3339();
    UserSubscription {
        id: generate_id(),
        user_id: user_id.to_string(),
        stripe_customer_id: None,
        stripe_subscription_id: None,
        plan_type: PlanType::Free,
        status: SubscriptionStatus::Incomplete,
        current_period_start: None,
        current_period_end: None,
        cancel_at_period_end: false,
        created_at: now.clone(),
        updated_at: now,
    }
}

// ── Subscription summary ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    /// The stored row, absent for users no billing event has touched yet.
    pub subscription: Option<UserSubscription>,
    pub plan: PlanType,
    pub plan_details: PlanLimits,
    pub usage: Usage,
}

/// Handle GET /subscription
pub async fn handle_get_subscription(
    ctx: &Arc<AppContext>,
    user_id: &str,
) -> Result<SubscriptionSummary, BillingRouteError> {
    let subscription = ctx.store.find_subscription_by_user(user_id).await?;
    let plan = quota::active_plan(ctx, user_id).await?;
    let plan_details = ctx.options.limits_for(plan);
    let usage = quota::collect_usage(ctx, user_id).await?;
    Ok(SubscriptionSummary {
        subscription,
        plan,
        plan_details,
        usage,
    })
}

// ── Webhook reconciliation ──────────────────────────────────────

/// Apply one verified provider webhook event to the subscription table.
///
/// Only storage failures surface as errors. Unknown event types, payloads
/// missing a user id, and events whose provider ids match no stored row are
/// logged and swallowed so the caller can acknowledge the delivery.
pub async fn reconcile_billing_event(
    ctx: &Arc<AppContext>,
    event: &WebhookEvent,
) -> Result<(), BillingRouteError> {
    let Some(action) = classify_event(&event.event_type) else {
        ctx.logger.warn(&format!(
            "Ignoring unsupported billing event type: {}",
            event.event_type
        ));
        return Ok(());
    };

    let object = &event.data.object;
    match action {
        BillingEvent::SubscriptionLink => {
            link_subscription(ctx, extract_checkout_session(object)).await
        }
        BillingEvent::SubscriptionCreated | BillingEvent::SubscriptionUpdated => {
            apply_subscription_update(ctx, extract_subscription_update(object)).await
        }
        BillingEvent::SubscriptionDeleted => {
            let update = extract_subscription_update(object);
            patch_by_provider_id(
                ctx,
                update.subscription_id.as_deref(),
                json!({
                    "status": SubscriptionStatus::Canceled.as_str(),
                    "planType": PlanType::Free.as_str(),
                    "updatedAt": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
        }
        BillingEvent::PaymentSucceeded => {
            let invoice = extract_invoice(object);
            patch_by_provider_id(
                ctx,
                invoice.subscription_id.as_deref(),
                json!({
                    "status": SubscriptionStatus::Active.as_str(),
                    "updatedAt": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
        }
        BillingEvent::PaymentFailed => {
            let invoice = extract_invoice(object);
            patch_by_provider_id(
                ctx,
                invoice.subscription_id.as_deref(),
                json!({
                    "status": SubscriptionStatus::PastDue.as_str(),
                    "updatedAt": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
        }
    }
}

/// Attach provider customer/subscription ids to the user named in the
/// checkout payload, creating the row if checkout never went through
/// `handle_create_checkout`.
async fn link_subscription(
    ctx: &Arc<AppContext>,
    session: CheckoutCompleted,
) -> Result<(), BillingRouteError> {
    let Some(user_id) = session.user_id else {
        ctx.logger
            .error("Dropping checkout completion event without a user id");
        return Ok(());
    };

    match ctx.store.find_subscription_by_user(&user_id).await? {
        Some(existing) => {
            let mut patch = json!({ "updatedAt": chrono::Utc::now().to_rfc3339() });
            if let Some(customer_id) = session.customer_id {
                patch["stripeCustomerId"] = json!(customer_id);
            }
            if let Some(subscription_id) = session.subscription_id {
                patch["stripeSubscriptionId"] = json!(subscription_id);
            }
            ctx.store.update_subscription(&existing.id, patch).await?;
        }
        None => {
            let mut row = blank_subscription(&user_id);
            row.stripe_customer_id = session.customer_id;
            row.stripe_subscription_id = session.subscription_id;
            ctx.store.create_subscription(&row).await?;
        }
    }
    Ok(())
}

/// Subscription created/updated: resolve the row by customer id, falling
/// back to the provider subscription id, then overwrite plan and status.
async fn apply_subscription_update(
    ctx: &Arc<AppContext>,
    update: SubscriptionUpdate,
) -> Result<(), BillingRouteError> {
    let row = resolve_subscription_row(
        ctx,
        update.customer_id.as_deref(),
        update.subscription_id.as_deref(),
    )
    .await?;
    let Some(row) = row else {
        ctx.logger.error(&format!(
            "Dropping subscription event for unknown customer {:?} / subscription {:?}",
            update.customer_id, update.subscription_id
        ));
        return Ok(());
    };

    let plan = ctx.billing.plan_for_price(update.price_id.as_deref());
    let mut patch = json!({
        "planType": plan.as_str(),
        "status": update.status.as_str(),
        "cancelAtPeriodEnd": update.cancel_at_period_end,
        "updatedAt": chrono::Utc::now().to_rfc3339(),
    });
    if let Some(subscription_id) = update.subscription_id {
        patch["stripeSubscriptionId"] = json!(subscription_id);
    }
    if let Some(customer_id) = update.customer_id {
        patch["stripeCustomerId"] = json!(customer_id);
    }
    if let Some(start) = update.current_period_start {
        patch["currentPeriodStart"] = json!(start);
    }
    if let Some(end) = update.current_period_end {
        patch["currentPeriodEnd"] = json!(end);
    }
    ctx.store.update_subscription(&row.id, patch).await?;
    Ok(())
}

async fn resolve_subscription_row(
    ctx: &Arc<AppContext>,
    customer_id: Option<&str>,
    subscription_id: Option<&str>,
) -> Result<Option<UserSubscription>, StoreError> {
    if let Some(customer_id) = customer_id {
        if let Some(row) = ctx.store.find_subscription_by_customer(customer_id).await? {
            return Ok(Some(row));
        }
    }
    if let Some(subscription_id) = subscription_id {
        if let Some(row) = ctx
            .store
            .find_subscription_by_provider_id(subscription_id)
            .await?
        {
            return Ok(Some(row));
        }
    }
    Ok(None)
}

/// Patch the row matching a provider subscription id. Deletion and invoice
/// events are keyed strictly by that id: after a plan change the customer
/// may already own a newer subscription, and a stale event for the old one
/// must not touch it.
async fn patch_by_provider_id(
    ctx: &Arc<AppContext>,
    subscription_id: Option<&str>,
    patch: serde_json::Value,
) -> Result<(), BillingRouteError> {
    let Some(subscription_id) = subscription_id else {
        ctx.logger
            .error("Dropping billing event without a subscription id");
        return Ok(());
    };
    match ctx
        .store
        .find_subscription_by_provider_id(subscription_id)
        .await?
    {
        Some(row) => {
            ctx.store.update_subscription(&row.id, patch).await?;
        }
        None => {
            ctx.logger.error(&format!(
                "Dropping billing event for unknown subscription {}",
                subscription_id
            ));
        }
    }
    Ok(())
}
