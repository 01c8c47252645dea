// Snippet route handlers.
//
// Reads are scoped to the caller (foreign snippets behave as missing);
// mutations distinguish a missing snippet from someone else's. Deletion
// cascades through the community projection in one transaction.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use snipstash_core::db::adapter::WhereClause;
use snipstash_core::db::models::Snippet;
use snipstash_core::error::{ApiError, ErrorCode, HttpStatus};
use snipstash_core::utils::generate_id;
use snipstash_core::SnipstashError;

use crate::context::AppContext;
use crate::quota;
use crate::store::{SnippetFilter, StoreError, NO_PROJECT_BUCKET};

/// Error type for snippet route handlers.
#[derive(Debug)]
pub enum SnippetRouteError {
    Validation(String),
    QuotaExceeded(String),
    ProjectNotFound,
    NotFound,
    NotOwner,
    Store(StoreError),
}

impl From<StoreError> for SnippetRouteError {
    fn from(e: StoreError) -> Self {
        SnippetRouteError::Store(e)
    }
}

impl From<SnipstashError> for SnippetRouteError {
    fn from(e: SnipstashError) -> Self {
        SnippetRouteError::Store(e.into())
    }
}

impl std::fmt::Display for SnippetRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnippetRouteError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            SnippetRouteError::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            SnippetRouteError::ProjectNotFound => write!(f, "Project not found"),
            SnippetRouteError::NotFound => write!(f, "Snippet not found"),
            SnippetRouteError::NotOwner => write!(f, "Not the snippet owner"),
            SnippetRouteError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl From<SnippetRouteError> for ApiError {
    fn from(e: SnippetRouteError) -> Self {
        match e {
            SnippetRouteError::Validation(msg) => {
                ApiError::with_message(HttpStatus::BadRequest, ErrorCode::ValidationFailed, msg)
            }
            SnippetRouteError::QuotaExceeded(reason) => ApiError::with_message(
                HttpStatus::Forbidden,
                ErrorCode::SnippetLimitReached,
                reason,
            ),
            SnippetRouteError::ProjectNotFound => ApiError::not_found(ErrorCode::ProjectNotFound),
            SnippetRouteError::NotFound => ApiError::not_found(ErrorCode::SnippetNotFound),
            SnippetRouteError::NotOwner => ApiError::forbidden(ErrorCode::NotSnippetOwner),
            SnippetRouteError::Store(StoreError::NotFound) => {
                ApiError::not_found(ErrorCode::SnippetNotFound)
            }
            SnippetRouteError::Store(_) => ApiError::internal(ErrorCode::InternalServerError),
        }
    }
}

// ── Create Snippet ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnippetRequest {
    pub title: String,
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Handle POST /snippets
///
/// Validates, checks the bucket quota, and stores the snippet private.
pub async fn handle_create_snippet(
    ctx: &Arc<AppContext>,
    user_id: &str,
    body: CreateSnippetRequest,
) -> Result<Snippet, SnippetRouteError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(SnippetRouteError::Validation(
            "Snippet title is required".to_string(),
        ));
    }
    if body.code.trim().is_empty() {
        return Err(SnippetRouteError::Validation(
            "Snippet code is required".to_string(),
        ));
    }

    // A target project must exist and belong to the caller
    if let Some(ref project_id) = body.project_id {
        ctx.store
            .find_project(user_id, project_id)
            .await?
            .ok_or(SnippetRouteError::ProjectNotFound)?;
    }

    let decision = quota::can_create_snippet(ctx, user_id, body.project_id.as_deref()).await?;
    if !decision.allowed {
        return Err(SnippetRouteError::QuotaExceeded(
            decision.reason.unwrap_or_default(),
        ));
    }

    let language = match body.language {
        Some(l) if !l.trim().is_empty() => l,
        _ => "plaintext".to_string(),
    };

    let now = chrono::Utc::now().to_rfc3339();
    let snippet = Snippet {
        id: generate_id(),
        user_id: user_id.to_string(),
        project_id: body.project_id,
        title: title.to_string(),
        code: body.code,
        language,
        tags: body.tags,
        is_public: false,
        created_at: now.clone(),
        updated_at: now,
    };
    Ok(ctx.store.create_snippet(&snippet).await?)
}

// ── List / Get ──────────────────────────────────────────────────

/// Handle GET /snippets
///
/// The caller's snippets, newest first, with optional filters.
pub async fn handle_list_snippets(
    ctx: &Arc<AppContext>,
    user_id: &str,
    filter: SnippetFilter,
) -> Result<Vec<Snippet>, SnippetRouteError> {
    Ok(ctx.store.list_snippets(user_id, &filter).await?)
}

/// Handle GET /snippets/{id}
pub async fn handle_get_snippet(
    ctx: &Arc<AppContext>,
    user_id: &str,
    snippet_id: &str,
) -> Result<Snippet, SnippetRouteError> {
    let snippet = ctx
        .store
        .find_snippet(snippet_id)
        .await?
        .ok_or(SnippetRouteError::NotFound)?;
    if snippet.user_id != user_id {
        return Err(SnippetRouteError::NotFound);
    }
    Ok(snippet)
}

// ── Update Snippet ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSnippetRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Move the snippet into a project, or detach it with "no-project".
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Handle PATCH /snippets/{id}
///
/// Partial update. Edits do not propagate to a published community copy;
/// that copy is frozen at publish time.
pub async fn handle_update_snippet(
    ctx: &Arc<AppContext>,
    user_id: &str,
    snippet_id: &str,
    body: UpdateSnippetRequest,
) -> Result<Snippet, SnippetRouteError> {
    let snippet = ctx
        .store
        .find_snippet(snippet_id)
        .await?
        .ok_or(SnippetRouteError::NotFound)?;
    if snippet.user_id != user_id {
        return Err(SnippetRouteError::NotOwner);
    }

    if let Some(ref title) = body.title {
        if title.trim().is_empty() {
            return Err(SnippetRouteError::Validation(
                "Snippet title cannot be empty".to_string(),
            ));
        }
    }
    if let Some(ref code) = body.code {
        if code.trim().is_empty() {
            return Err(SnippetRouteError::Validation(
                "Snippet code cannot be empty".to_string(),
            ));
        }
    }

    let mut patch = json!({ "updatedAt": chrono::Utc::now().to_rfc3339() });
    if let Some(title) = body.title {
        patch["title"] = json!(title.trim());
    }
    if let Some(code) = body.code {
        patch["code"] = json!(code);
    }
    if let Some(language) = body.language {
        patch["language"] = json!(language);
    }
    if let Some(tags) = body.tags {
        // Tags live in the row as JSON text
        let text =
            serde_json::to_string(&tags).map_err(|e| StoreError::Serialization(e.to_string()))?;
        patch["tags"] = json!(text);
    }
    if let Some(target) = body.project_id {
        if target == NO_PROJECT_BUCKET {
            patch["projectId"] = serde_json::Value::Null;
        } else {
            ctx.store
                .find_project(user_id, &target)
                .await?
                .ok_or(SnippetRouteError::ProjectNotFound)?;
            patch["projectId"] = json!(target);
        }
    }

    Ok(ctx.store.update_snippet(snippet_id, patch).await?)
}

// ── Delete Snippet ──────────────────────────────────────────────

/// Handle DELETE /snippets/{id}
///
/// One transaction: likes on the community copy, the copy itself, then the
/// snippet row.
pub async fn handle_delete_snippet(
    ctx: &Arc<AppContext>,
    user_id: &str,
    snippet_id: &str,
) -> Result<(), SnippetRouteError> {
    let snippet = ctx
        .store
        .find_snippet(snippet_id)
        .await?
        .ok_or(SnippetRouteError::NotFound)?;
    if snippet.user_id != user_id {
        return Err(SnippetRouteError::NotOwner);
    }

    let tx = ctx.store.begin().await?;
    if let Some(post) = tx
        .find_one("community", &[WhereClause::eq("snippetId", snippet_id)])
        .await?
    {
        if let Some(post_id) = post["id"].as_str() {
            tx.delete_many("community_likes", &[WhereClause::eq("communityId", post_id)])
                .await?;
        }
        tx.delete_many("community", &[WhereClause::eq("snippetId", snippet_id)])
            .await?;
    }
    tx.delete("snippets", &[WhereClause::eq("id", snippet_id)])
        .await?;
    tx.commit().await?;
    Ok(())
}
