// Project route handlers.
//
// Projects are owned exclusively by one user, and every lookup is scoped by
// the caller's id, so another user's project behaves as missing rather than
// forbidden. Deleting a project leaves its snippets in place with a dangling
// `projectId`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use snipstash_core::db::models::Project;
use snipstash_core::error::{ApiError, ErrorCode, HttpStatus};
use snipstash_core::utils::generate_id;

use crate::context::AppContext;
use crate::quota;
use crate::store::StoreError;

/// Error type for project route handlers.
#[derive(Debug)]
pub enum ProjectRouteError {
    Validation(String),
    QuotaExceeded(String),
    NotFound,
    Store(StoreError),
}

impl From<StoreError> for ProjectRouteError {
    fn from(e: StoreError) -> Self {
        ProjectRouteError::Store(e)
    }
}

impl std::fmt::Display for ProjectRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectRouteError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            ProjectRouteError::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            ProjectRouteError::NotFound => write!(f, "Project not found"),
            ProjectRouteError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl From<ProjectRouteError> for ApiError {
    fn from(e: ProjectRouteError) -> Self {
        match e {
            ProjectRouteError::Validation(msg) => {
                ApiError::with_message(HttpStatus::BadRequest, ErrorCode::ValidationFailed, msg)
            }
            ProjectRouteError::QuotaExceeded(reason) => ApiError::with_message(
                HttpStatus::Forbidden,
                ErrorCode::ProjectLimitReached,
                reason,
            ),
            ProjectRouteError::NotFound => ApiError::not_found(ErrorCode::ProjectNotFound),
            ProjectRouteError::Store(StoreError::NotFound) => {
                ApiError::not_found(ErrorCode::ProjectNotFound)
            }
            ProjectRouteError::Store(_) => ApiError::internal(ErrorCode::InternalServerError),
        }
    }
}

// ── Create Project ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Handle POST /projects
///
/// Creates a project after a plan quota check.
pub async fn handle_create_project(
    ctx: &Arc<AppContext>,
    user_id: &str,
    body: CreateProjectRequest,
) -> Result<Project, ProjectRouteError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ProjectRouteError::Validation(
            "Project name is required".to_string(),
        ));
    }

    let decision = quota::can_create_project(ctx, user_id).await?;
    if !decision.allowed {
        return Err(ProjectRouteError::QuotaExceeded(
            decision.reason.unwrap_or_default(),
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let project = Project {
        id: generate_id(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        description: body.description,
        color: body.color,
        created_at: now.clone(),
        updated_at: now,
    };
    Ok(ctx.store.create_project(&project).await?)
}

// ── List / Get ──────────────────────────────────────────────────

/// Handle GET /projects
///
/// The caller's projects, newest first.
pub async fn handle_list_projects(
    ctx: &Arc<AppContext>,
    user_id: &str,
) -> Result<Vec<Project>, ProjectRouteError> {
    Ok(ctx.store.list_projects(user_id).await?)
}

/// Handle GET /projects/{id}
pub async fn handle_get_project(
    ctx: &Arc<AppContext>,
    user_id: &str,
    project_id: &str,
) -> Result<Project, ProjectRouteError> {
    ctx.store
        .find_project(user_id, project_id)
        .await?
        .ok_or(ProjectRouteError::NotFound)
}

// ── Update Project ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Handle PATCH /projects/{id}
///
/// Partial update; absent fields keep their current values.
pub async fn handle_update_project(
    ctx: &Arc<AppContext>,
    user_id: &str,
    project_id: &str,
    body: UpdateProjectRequest,
) -> Result<Project, ProjectRouteError> {
    ctx.store
        .find_project(user_id, project_id)
        .await?
        .ok_or(ProjectRouteError::NotFound)?;

    if let Some(ref name) = body.name {
        if name.trim().is_empty() {
            return Err(ProjectRouteError::Validation(
                "Project name cannot be empty".to_string(),
            ));
        }
    }

    let mut patch = json!({ "updatedAt": chrono::Utc::now().to_rfc3339() });
    if let Some(name) = body.name {
        patch["name"] = json!(name.trim());
    }
    if let Some(description) = body.description {
        patch["description"] = json!(description);
    }
    if let Some(color) = body.color {
        patch["color"] = json!(color);
    }

    Ok(ctx.store.update_project(project_id, patch).await?)
}

// ── Delete Project ──────────────────────────────────────────────

/// Handle DELETE /projects/{id}
///
/// Snippets filed under the project are not touched; their `projectId` is
/// left dangling.
pub async fn handle_delete_project(
    ctx: &Arc<AppContext>,
    user_id: &str,
    project_id: &str,
) -> Result<(), ProjectRouteError> {
    ctx.store
        .find_project(user_id, project_id)
        .await?
        .ok_or(ProjectRouteError::NotFound)?;
    Ok(ctx.store.delete_project(project_id).await?)
}
