// Community feed route handlers.
//
// The feed is world-readable. The view counter is a plain read-modify-write
// (last writer wins under concurrency); the like toggle runs in a
// transaction because it keeps the likes table and the counter consistent.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use snipstash_core::db::adapter::WhereClause;
use snipstash_core::db::models::{CommunityLike, CommunityPost};
use snipstash_core::error::{ApiError, ErrorCode};
use snipstash_core::utils::generate_id;
use snipstash_core::SnipstashError;

use crate::context::AppContext;
use crate::store::{parse_i64, StoreError};

/// Error type for community route handlers.
#[derive(Debug)]
pub enum CommunityRouteError {
    NotFound,
    Store(StoreError),
}

impl From<StoreError> for CommunityRouteError {
    fn from(e: StoreError) -> Self {
        CommunityRouteError::Store(e)
    }
}

impl From<SnipstashError> for CommunityRouteError {
    fn from(e: SnipstashError) -> Self {
        CommunityRouteError::Store(e.into())
    }
}

impl std::fmt::Display for CommunityRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommunityRouteError::NotFound => write!(f, "Community post not found"),
            CommunityRouteError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl From<CommunityRouteError> for ApiError {
    fn from(e: CommunityRouteError) -> Self {
        match e {
            CommunityRouteError::NotFound | CommunityRouteError::Store(StoreError::NotFound) => {
                ApiError::not_found(ErrorCode::PostNotFound)
            }
            CommunityRouteError::Store(_) => ApiError::internal(ErrorCode::InternalServerError),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub views_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

// ── Feed ────────────────────────────────────────────────────────

/// Handle GET /community
///
/// Public posts, newest first. `limit` defaults to 50 and is capped at 100.
pub async fn handle_list_feed(
    ctx: &Arc<AppContext>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Vec<CommunityPost>, CommunityRouteError> {
    let limit = limit.unwrap_or(50).clamp(1, 100);
    let offset = offset.unwrap_or(0).max(0);
    Ok(ctx.store.list_posts(limit, offset).await?)
}

/// Handle GET /community/{id}
pub async fn handle_get_post(
    ctx: &Arc<AppContext>,
    post_id: &str,
) -> Result<CommunityPost, CommunityRouteError> {
    ctx.store
        .find_post(post_id)
        .await?
        .ok_or(CommunityRouteError::NotFound)
}

// ── Engagement ──────────────────────────────────────────────────

/// Handle POST /community/{id}/view
///
/// Read-modify-write on the counter; concurrent views can overwrite each
/// other and the last writer wins.
pub async fn handle_record_view(
    ctx: &Arc<AppContext>,
    post_id: &str,
) -> Result<ViewResponse, CommunityRouteError> {
    let post = ctx
        .store
        .find_post(post_id)
        .await?
        .ok_or(CommunityRouteError::NotFound)?;
    let views_count = post.views_count + 1;
    ctx.store
        .update_post(post_id, json!({ "viewsCount": views_count }))
        .await?;
    Ok(ViewResponse { views_count })
}

/// Handle POST /community/{id}/like
///
/// Toggles the caller's like. At most one like row exists per (post, user);
/// the counter moves with the row and never drops below zero.
pub async fn handle_toggle_like(
    ctx: &Arc<AppContext>,
    user_id: &str,
    post_id: &str,
) -> Result<LikeResponse, CommunityRouteError> {
    let tx = ctx.store.begin().await?;

    let post = tx
        .find_one("community", &[WhereClause::eq("id", post_id)])
        .await?
        .ok_or(CommunityRouteError::NotFound)?;

    let existing = tx
        .find_one(
            "community_likes",
            &[
                WhereClause::eq("communityId", post_id).and(),
                WhereClause::eq("userId", user_id),
            ],
        )
        .await?;

    let (liked, delta) = match existing {
        Some(_) => {
            tx.delete(
                "community_likes",
                &[
                    WhereClause::eq("communityId", post_id).and(),
                    WhereClause::eq("userId", user_id),
                ],
            )
            .await?;
            (false, -1)
        }
        None => {
            let like = CommunityLike {
                id: generate_id(),
                community_id: post_id.to_string(),
                user_id: user_id.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            let row = serde_json::to_value(&like)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            tx.create("community_likes", row, None).await?;
            (true, 1)
        }
    };

    let likes_count = (parse_i64(&post["likesCount"]) + delta).max(0);
    tx.update(
        "community",
        &[WhereClause::eq("id", post_id)],
        json!({ "likesCount": likes_count }),
    )
    .await?
    .ok_or(CommunityRouteError::NotFound)?;

    tx.commit().await?;

    Ok(LikeResponse { liked, likes_count })
}

#[cfg(test)]
mod tests {
    use snipstash_billing::config::BillingOptions;
    use snipstash_core::options::AppOptions;
    use snipstash_memory::MemoryAdapter;

    use super::*;
    use crate::routes::snippets::{handle_create_snippet, CreateSnippetRequest};
    use crate::routes::visibility::{handle_set_visibility, SetVisibilityRequest};
    use crate::store::ConcreteStore;

    fn test_ctx() -> Arc<AppContext> {
        AppContext::new(
            AppOptions::new(),
            BillingOptions::new("sk_test", "whsec_test", "price_pro"),
            Arc::new(ConcreteStore::new(Arc::new(MemoryAdapter::new()))),
        )
    }

    async fn publish_snippet(ctx: &Arc<AppContext>, title: &str) -> CommunityPost {
        let snippet = handle_create_snippet(
            ctx,
            "usr_author",
            CreateSnippetRequest {
                title: title.into(),
                code: "let x = 1;".into(),
                language: Some("rust".into()),
                tags: vec![],
                project_id: None,
            },
        )
        .await
        .expect("create snippet");
        handle_set_visibility(
            ctx,
            "usr_author",
            &snippet.id,
            SetVisibilityRequest { is_public: true },
        )
        .await
        .expect("publish")
        .post
        .expect("post created")
    }

    #[tokio::test]
    async fn test_view_increments_counter() {
        let ctx = test_ctx();
        let post = publish_snippet(&ctx, "Viewed").await;

        let first = handle_record_view(&ctx, &post.id).await.expect("view");
        assert_eq!(first.views_count, 1);
        let second = handle_record_view(&ctx, &post.id).await.expect("view");
        assert_eq!(second.views_count, 2);
    }

    #[tokio::test]
    async fn test_like_toggles_and_never_goes_negative() {
        let ctx = test_ctx();
        let post = publish_snippet(&ctx, "Liked").await;

        let liked = handle_toggle_like(&ctx, "usr_fan", &post.id)
            .await
            .expect("like");
        assert!(liked.liked);
        assert_eq!(liked.likes_count, 1);

        let unliked = handle_toggle_like(&ctx, "usr_fan", &post.id)
            .await
            .expect("unlike");
        assert!(!unliked.liked);
        assert_eq!(unliked.likes_count, 0);

        // A second unliker cannot push the counter below zero
        let again = handle_toggle_like(&ctx, "usr_fan", &post.id)
            .await
            .expect("like again");
        assert_eq!(again.likes_count, 1);
    }

    #[tokio::test]
    async fn test_engagement_on_missing_post() {
        let ctx = test_ctx();
        assert!(matches!(
            handle_record_view(&ctx, "post_missing").await,
            Err(CommunityRouteError::NotFound)
        ));
        assert!(matches!(
            handle_toggle_like(&ctx, "usr_fan", "post_missing").await,
            Err(CommunityRouteError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_feed_is_paginated() {
        let ctx = test_ctx();
        for i in 0..3 {
            publish_snippet(&ctx, &format!("Post {}", i)).await;
        }

        let all = handle_list_feed(&ctx, None, None).await.expect("list");
        assert_eq!(all.len(), 3);

        let page = handle_list_feed(&ctx, Some(2), Some(1)).await.expect("page");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, all[1].title);
    }
}
