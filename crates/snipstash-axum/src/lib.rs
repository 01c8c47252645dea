#![doc = include_str!("../README.md")]

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use snipstash::context::AppContext;
use snipstash::identity::ensure_user;
use snipstash::routes;
use snipstash::store::{SnippetFilter, Store};
use snipstash_billing::config::BillingOptions;
use snipstash_billing::types::{CreateCheckoutRequest, WebhookEvent};
use snipstash_billing::webhook::verify_webhook_signature;
use snipstash_core::db::models::UserRecord;
use snipstash_core::error::{ApiError, ErrorCode};
use snipstash_core::options::AppOptions;

// ─── Error Handling ─────────────────────────────────────────────

/// Wrapper that renders a core [`ApiError`] as an Axum JSON response.
///
/// Every route-handler error type converts into `ApiError` in the
/// `snipstash` crate, so one blanket `From` is enough to make `?` work
/// in all handlers here.
pub struct AppError(ApiError);

impl<E> From<E> for AppError
where
    E: Into<ApiError>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error": {
                "message": self.0.message,
                "code": self.0.code,
                "status": self.0.status.status_code(),
            }
        });

        (status, Json(body)).into_response()
    }
}

fn unauthorized() -> AppError {
    AppError(ApiError::unauthorized(ErrorCode::Unauthorized))
}

// ─── Identity Extraction ────────────────────────────────────────

/// Extract the token from an `Authorization: Bearer <token>` header.
fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Resolve the caller from the bearer token and mirror the identity into
/// the users table. All authenticated handlers go through this.
async fn require_user(
    ctx: &Arc<AppContext>,
    headers: &axum::http::HeaderMap,
) -> Result<UserRecord, AppError> {
    let token = extract_bearer_token(headers).ok_or_else(unauthorized)?;
    let identity = ctx.identity.resolve(&token).await.ok_or_else(unauthorized)?;

    match ensure_user(ctx.store.as_ref(), &identity).await {
        Ok(user) => Ok(user),
        Err(e) => {
            ctx.logger
                .error(&format!("Failed to mirror identity {}: {}", identity.id, e));
            Err(AppError(ApiError::internal(ErrorCode::InternalServerError)))
        }
    }
}

// ─── Snipstash Builder ──────────────────────────────────────────

/// The main entry point for serving Snipstash over Axum.
///
/// # Example
///
/// ```rust,ignore
/// use snipstash_axum::Snipstash;
///
/// let app = Snipstash::new(options, billing, store);
/// let router = app.router();
/// // axum::serve(listener, router)
/// ```
pub struct Snipstash {
    ctx: Arc<AppContext>,
}

impl Snipstash {
    /// Create a new instance from options, billing configuration, and a store.
    pub fn new(options: AppOptions, billing: BillingOptions, store: Arc<dyn Store>) -> Self {
        let ctx = AppContext::new(options, billing, store);
        Self { ctx }
    }

    /// Create from an existing `AppContext`.
    pub fn from_context(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Get a reference to the application context.
    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Build the Axum `Router` with all endpoints.
    ///
    /// The router is nested under the configured `base_path` (default: `/api`).
    pub fn router(&self) -> Router {
        let base_path = self.ctx.base_path.clone();
        Router::new().nest(&base_path, self.api_routes())
    }

    /// Build the Axum `Router` with CORS enabled.
    ///
    /// Allows all origins by default. For production, configure CORS manually.
    pub fn router_with_cors(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        self.router().layer(cors)
    }

    /// Build the internal API routes (not nested under base_path).
    fn api_routes(&self) -> Router {
        Router::new()
            // Health
            .route("/ok", get(handle_ok))
            // Projects
            .route("/projects", post(handle_create_project).get(handle_list_projects))
            .route(
                "/projects/{id}",
                get(handle_get_project)
                    .patch(handle_update_project)
                    .delete(handle_delete_project),
            )
            // Snippets
            .route("/snippets", post(handle_create_snippet).get(handle_list_snippets))
            .route(
                "/snippets/{id}",
                get(handle_get_snippet)
                    .patch(handle_update_snippet)
                    .delete(handle_delete_snippet),
            )
            .route("/snippets/{id}/visibility", post(handle_set_visibility))
            // Community
            .route("/community", get(handle_list_feed))
            .route("/community/{id}", get(handle_get_post))
            .route("/community/{id}/view", post(handle_record_view))
            .route("/community/{id}/like", post(handle_toggle_like))
            // Code check
            .route("/check", post(handle_check_code))
            // Billing
            .route("/checkout", post(handle_create_checkout))
            .route("/subscription", get(handle_get_subscription))
            .route("/webhooks", post(handle_billing_webhook))
            .with_state(self.ctx.clone())
    }
}

// ─── Health ─────────────────────────────────────────────────────

async fn handle_ok() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

// ─── Project Handlers ───────────────────────────────────────────

async fn handle_create_project(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<routes::projects::CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let project = routes::projects::handle_create_project(&ctx, &user.id, body).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn handle_list_projects(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let projects = routes::projects::handle_list_projects(&ctx, &user.id).await?;
    Ok(Json(projects))
}

async fn handle_get_project(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let project = routes::projects::handle_get_project(&ctx, &user.id, &id).await?;
    Ok(Json(project))
}

async fn handle_update_project(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<routes::projects::UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let project = routes::projects::handle_update_project(&ctx, &user.id, &id, body).await?;
    Ok(Json(project))
}

async fn handle_delete_project(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    routes::projects::handle_delete_project(&ctx, &user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Snippet Handlers ───────────────────────────────────────────

/// Query parameters for `GET /snippets`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SnippetListQuery {
    project_id: Option<String>,
    language: Option<String>,
    q: Option<String>,
    tag: Option<String>,
}

async fn handle_create_snippet(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<routes::snippets::CreateSnippetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let snippet = routes::snippets::handle_create_snippet(&ctx, &user.id, body).await?;
    Ok((StatusCode::CREATED, Json(snippet)))
}

async fn handle_list_snippets(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Query(query): Query<SnippetListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let filter = SnippetFilter {
        project_id: query.project_id,
        language: query.language,
        q: query.q,
        tag: query.tag,
    };
    let snippets = routes::snippets::handle_list_snippets(&ctx, &user.id, filter).await?;
    Ok(Json(snippets))
}

async fn handle_get_snippet(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let snippet = routes::snippets::handle_get_snippet(&ctx, &user.id, &id).await?;
    Ok(Json(snippet))
}

async fn handle_update_snippet(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<routes::snippets::UpdateSnippetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let snippet = routes::snippets::handle_update_snippet(&ctx, &user.id, &id, body).await?;
    Ok(Json(snippet))
}

async fn handle_delete_snippet(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    routes::snippets::handle_delete_snippet(&ctx, &user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_set_visibility(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<routes::visibility::SetVisibilityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let result = routes::visibility::handle_set_visibility(&ctx, &user.id, &id, body).await?;
    Ok(Json(result))
}

// ─── Community Handlers ─────────────────────────────────────────

/// Query parameters for `GET /community`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FeedQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn handle_list_feed(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let posts = routes::community::handle_list_feed(&ctx, query.limit, query.offset).await?;
    Ok(Json(posts))
}

async fn handle_get_post(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post = routes::community::handle_get_post(&ctx, &id).await?;
    Ok(Json(post))
}

async fn handle_record_view(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = routes::community::handle_record_view(&ctx, &id).await?;
    Ok(Json(result))
}

async fn handle_toggle_like(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let result = routes::community::handle_toggle_like(&ctx, &user.id, &id).await?;
    Ok(Json(result))
}

// ─── Code Check Handler ─────────────────────────────────────────

/// Request body for `POST /check`.
#[derive(Debug, serde::Deserialize)]
struct CheckCodeRequest {
    code: String,
    #[serde(default)]
    language: Option<String>,
}

async fn handle_check_code(Json(body): Json<CheckCodeRequest>) -> impl IntoResponse {
    let language = match body.language.as_deref() {
        Some(lang) if !lang.trim().is_empty() => lang,
        _ => "plaintext",
    };
    Json(snipstash::check_code(&body.code, language))
}

// ─── Billing Handlers ───────────────────────────────────────────

async fn handle_create_checkout(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let session = routes::billing::handle_create_checkout(&ctx, &user.id, body).await?;
    Ok(Json(session))
}

async fn handle_get_subscription(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&ctx, &headers).await?;
    let summary = routes::billing::handle_get_subscription(&ctx, &user.id).await?;
    Ok(Json(summary))
}

/// Billing provider webhook endpoint.
///
/// The signature covers the raw body, so this handler takes `Bytes` and
/// verifies before any JSON parsing. A bad signature drops the request with
/// a 400 and nothing is processed.
async fn handle_billing_webhook(
    State(ctx): State<Arc<AppContext>>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if verify_webhook_signature(&body, signature, &ctx.billing.webhook_secret).is_err() {
        ctx.logger.warn("Rejected webhook with invalid signature");
        return AppError(ApiError::bad_request(ErrorCode::InvalidWebhookSignature))
            .into_response();
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(_) => {
            return AppError(ApiError::bad_request(ErrorCode::CouldNotParseBody)).into_response();
        }
    };

    match routes::billing::reconcile_billing_event(&ctx, &event).await {
        Ok(()) => Json(serde_json::json!({ "received": true })).into_response(),
        Err(e) => AppError(e.into()).into_response(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use snipstash::store::ConcreteStore;
    use snipstash_memory::MemoryAdapter;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("authorization", "Bearer my-token-123".parse().unwrap());
        assert_eq!(
            extract_bearer_token(&headers),
            Some("my-token-123".to_string())
        );
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("authorization", "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_router_creation() {
        let store: Arc<dyn Store> = Arc::new(ConcreteStore::new(Arc::new(MemoryAdapter::new())));
        let app = Snipstash::new(
            AppOptions::new(),
            BillingOptions::new("sk_test", "whsec_test", "price_pro"),
            store,
        );
        let _router = app.router();
    }
}
