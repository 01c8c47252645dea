// Plan resolution and quota checks.
//
// Checks are advisory: they read a count and compare it to the plan ceiling
// without holding a lock, so a concurrent burst of creates can land slightly
// over the limit. Enforcement happens before the insert, never after.

use std::collections::HashMap;

use serde::Serialize;

use snipstash_billing::types::SubscriptionStatus;
use snipstash_core::plan::PlanType;

use crate::context::AppContext;
use crate::store::{SnippetFilter, StoreError, NO_PROJECT_BUCKET};

/// The outcome of a quota check.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Set when denied; names the plan and the numeric limit that was hit.
    pub reason: Option<String>,
}

impl QuotaDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// The caller's effective plan tier.
///
/// PRO requires a subscription row that is both on the PRO plan and in
/// `active` status. No row, a canceled row, or a delinquent one all resolve
/// to FREE.
pub async fn active_plan(ctx: &AppContext, user_id: &str) -> Result<PlanType, StoreError> {
    let subscription = ctx.store.find_subscription_by_user(user_id).await?;
    Ok(match subscription {
        Some(sub) if sub.plan_type == PlanType::Pro && sub.status == SubscriptionStatus::Active => {
            PlanType::Pro
        }
        _ => PlanType::Free,
    })
}

/// Whether the user may create another project under their plan.
pub async fn can_create_project(
    ctx: &AppContext,
    user_id: &str,
) -> Result<QuotaDecision, StoreError> {
    let plan = active_plan(ctx, user_id).await?;
    let limits = ctx.options.limits_for(plan);
    let current = ctx.store.count_projects(user_id).await?;
    if limits.allows_another_project(current) {
        return Ok(QuotaDecision::allow());
    }
    Ok(QuotaDecision::deny(format!(
        "Project limit reached: the {} plan allows up to {} projects. Upgrade to PRO for unlimited projects.",
        plan, limits.max_projects
    )))
}

/// Whether the user may create another snippet in the given bucket.
///
/// Each project is its own bucket; `None` is the shared bucket for snippets
/// without a project.
pub async fn can_create_snippet(
    ctx: &AppContext,
    user_id: &str,
    project_id: Option<&str>,
) -> Result<QuotaDecision, StoreError> {
    let plan = active_plan(ctx, user_id).await?;
    let limits = ctx.options.limits_for(plan);
    let current = ctx
        .store
        .count_snippets_in_bucket(user_id, project_id)
        .await?;
    if limits.allows_another_snippet(current) {
        return Ok(QuotaDecision::allow());
    }
    Ok(QuotaDecision::deny(format!(
        "Snippet limit reached: the {} plan allows up to {} snippets per project. Upgrade to PRO for unlimited snippets.",
        plan, limits.max_snippets_per_project
    )))
}

/// Current usage counts, reported alongside the subscription summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub projects: i64,
    /// Snippet counts keyed by project id; unfiled snippets appear under
    /// [`NO_PROJECT_BUCKET`].
    pub snippets: HashMap<String, i64>,
}

/// Count the user's projects and snippets per bucket.
pub async fn collect_usage(ctx: &AppContext, user_id: &str) -> Result<Usage, StoreError> {
    let projects = ctx.store.count_projects(user_id).await?;
    let all_snippets = ctx
        .store
        .list_snippets(user_id, &SnippetFilter::default())
        .await?;

    let mut snippets: HashMap<String, i64> = HashMap::new();
    for snippet in &all_snippets {
        let bucket = snippet
            .project_id
            .clone()
            .unwrap_or_else(|| NO_PROJECT_BUCKET.to_string());
        *snippets.entry(bucket).or_insert(0) += 1;
    }

    Ok(Usage { projects, snippets })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use snipstash_billing::config::BillingOptions;
    use snipstash_billing::types::UserSubscription;
    use snipstash_core::options::AppOptions;

    use super::*;
    use crate::store::tests::MockStore;
    use crate::store::Store;

    fn ctx_with(store: MockStore) -> Arc<AppContext> {
        AppContext::new(
            AppOptions::new(),
            BillingOptions::new("sk_test", "whsec_test", "price_pro"),
            Arc::new(store),
        )
    }

    fn pro_subscription(status: SubscriptionStatus) -> UserSubscription {
        UserSubscription {
            id: "subrow_1".into(),
            user_id: "usr_1".into(),
            stripe_customer_id: Some("cus_1".into()),
            stripe_subscription_id: Some("sub_1".into()),
            plan_type: PlanType::Pro,
            status,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    #[tokio::test]
    async fn test_no_subscription_is_free() {
        let ctx = ctx_with(MockStore::default());
        assert_eq!(active_plan(&ctx, "usr_1").await.unwrap(), PlanType::Free);
    }

    #[tokio::test]
    async fn test_active_pro_subscription_is_pro() {
        let ctx = ctx_with(MockStore {
            subscription: Some(pro_subscription(SubscriptionStatus::Active)),
            ..Default::default()
        });
        assert_eq!(active_plan(&ctx, "usr_1").await.unwrap(), PlanType::Pro);
    }

    #[tokio::test]
    async fn test_lapsed_pro_subscription_is_free() {
        for status in [
            SubscriptionStatus::Canceled,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Incomplete,
        ] {
            let ctx = ctx_with(MockStore {
                subscription: Some(pro_subscription(status)),
                ..Default::default()
            });
            assert_eq!(active_plan(&ctx, "usr_1").await.unwrap(), PlanType::Free);
        }
    }

    #[tokio::test]
    async fn test_project_quota_under_limit() {
        let ctx = ctx_with(MockStore {
            project_count: 2,
            ..Default::default()
        });
        let decision = can_create_project(&ctx, "usr_1").await.unwrap();
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
    }

    #[tokio::test]
    async fn test_project_quota_at_limit() {
        let ctx = ctx_with(MockStore {
            project_count: 3,
            ..Default::default()
        });
        let decision = can_create_project(&ctx, "usr_1").await.unwrap();
        assert!(!decision.allowed);
        let reason = decision.reason.expect("denial carries a reason");
        assert!(reason.contains("3"), "reason names the limit: {}", reason);
        assert!(reason.contains("FREE"));
    }

    #[tokio::test]
    async fn test_pro_ignores_project_limit() {
        let ctx = ctx_with(MockStore {
            project_count: 500,
            subscription: Some(pro_subscription(SubscriptionStatus::Active)),
            ..Default::default()
        });
        assert!(can_create_project(&ctx, "usr_1").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_snippet_quota_per_bucket() {
        let mut bucket_counts = HashMap::new();
        bucket_counts.insert(Some("proj_1".to_string()), 10);
        bucket_counts.insert(None, 4);
        let ctx = ctx_with(MockStore {
            bucket_counts,
            ..Default::default()
        });

        // proj_1 is full
        let full = can_create_snippet(&ctx, "usr_1", Some("proj_1"))
            .await
            .unwrap();
        assert!(!full.allowed);
        assert!(full.reason.expect("reason").contains("10"));

        // the unfiled bucket still has room
        assert!(can_create_snippet(&ctx, "usr_1", None).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_collect_usage_counts_projects() {
        let ctx = ctx_with(MockStore {
            project_count: 2,
            ..Default::default()
        });
        let usage = collect_usage(&ctx, "usr_1").await.unwrap();
        assert_eq!(usage.projects, 2);
        assert!(usage.snippets.is_empty());
    }

    #[tokio::test]
    async fn test_mock_bucket_counts_default_to_zero() {
        let store = MockStore::default();
        assert_eq!(
            store.count_snippets_in_bucket("usr_1", Some("proj_x")).await.unwrap(),
            0
        );
    }
}
