// Visibility toggle: the one snippet flag with side effects.
//
// Publishing mirrors the snippet into the community table; unpublishing
// removes the mirror and its likes. Both directions run in one transaction
// and are idempotent, so a repeated toggle (two tabs, a retried request)
// converges on the same state instead of duplicating rows.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use snipstash_core::db::adapter::WhereClause;
use snipstash_core::db::models::{CommunityPost, Snippet};
use snipstash_core::error::{ApiError, ErrorCode};
use snipstash_core::utils::generate_id;
use snipstash_core::SnipstashError;

use crate::context::AppContext;
use crate::store::{parse_post, parse_snippet, post_row, StoreError};

/// Error type for the visibility handler.
#[derive(Debug)]
pub enum VisibilityError {
    NotFound,
    NotOwner,
    Store(StoreError),
}

impl From<StoreError> for VisibilityError {
    fn from(e: StoreError) -> Self {
        VisibilityError::Store(e)
    }
}

impl From<SnipstashError> for VisibilityError {
    fn from(e: SnipstashError) -> Self {
        VisibilityError::Store(e.into())
    }
}

impl std::fmt::Display for VisibilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisibilityError::NotFound => write!(f, "Snippet not found"),
            VisibilityError::NotOwner => write!(f, "Not the snippet owner"),
            VisibilityError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl From<VisibilityError> for ApiError {
    fn from(e: VisibilityError) -> Self {
        match e {
            VisibilityError::NotFound | VisibilityError::Store(StoreError::NotFound) => {
                ApiError::not_found(ErrorCode::SnippetNotFound)
            }
            VisibilityError::NotOwner => ApiError::forbidden(ErrorCode::NotSnippetOwner),
            VisibilityError::Store(_) => ApiError::internal(ErrorCode::InternalServerError),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVisibilityRequest {
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityResponse {
    pub snippet: Snippet,
    /// The community projection; present while the snippet is public.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<CommunityPost>,
}

/// Handle POST /snippets/{id}/visibility
///
/// Publishing copies the snippet into the community feed with zeroed
/// counters, preserving its original creation time. Unpublishing deletes the
/// copy and every like on it, so a later re-publish starts from zero again.
pub async fn handle_set_visibility(
    ctx: &Arc<AppContext>,
    user_id: &str,
    snippet_id: &str,
    body: SetVisibilityRequest,
) -> Result<VisibilityResponse, VisibilityError> {
    // 1. The snippet must exist and belong to the caller
    let snippet = ctx
        .store
        .find_snippet(snippet_id)
        .await?
        .ok_or(VisibilityError::NotFound)?;
    if snippet.user_id != user_id {
        return Err(VisibilityError::NotOwner);
    }

    let tx = ctx.store.begin().await?;

    // 2. Flip the flag
    let updated = tx
        .update(
            "snippets",
            &[WhereClause::eq("id", snippet_id)],
            json!({
                "isPublic": body.is_public,
                "updatedAt": chrono::Utc::now().to_rfc3339(),
            }),
        )
        .await?
        .ok_or(VisibilityError::NotFound)?;
    let updated = parse_snippet(&updated)?;

    // 3. Sync the community projection
    let post = if body.is_public {
        let existing = tx
            .find_one("community", &[WhereClause::eq("snippetId", snippet_id)])
            .await?;
        match existing {
            // Re-publish is a no-op; the existing copy keeps its counters
            Some(row) => Some(parse_post(&row)?),
            None => {
                let post = CommunityPost::from_snippet(generate_id(), &snippet);
                let created = tx.create("community", post_row(&post)?, None).await?;
                Some(parse_post(&created)?)
            }
        }
    } else {
        let existing = tx
            .find_one("community", &[WhereClause::eq("snippetId", snippet_id)])
            .await?;
        if let Some(row) = existing {
            if let Some(post_id) = row["id"].as_str() {
                tx.delete_many("community_likes", &[WhereClause::eq("communityId", post_id)])
                    .await?;
            }
            tx.delete_many("community", &[WhereClause::eq("snippetId", snippet_id)])
                .await?;
        }
        None
    };

    tx.commit().await?;

    Ok(VisibilityResponse {
        snippet: updated,
        post,
    })
}
