mod analytics;
mod dashboard;
mod genie;
mod health;
mod recommendations;
mod submissions;
mod user;

use std::sync::Arc;

use axum::{
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use posdash_core::AppConfig;
use posdash_databricks::{ClaudeClient, GenieClient};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::frontend;
use crate::middleware::request_id;

pub(crate) const APP_NAME: &str = "Danone POS Analytics";

#[derive(Clone)]
pub struct AppState {
    /// `None` when the database could not be reached at startup.
    pub pool: Option<PgPool>,
    pub config: Arc<AppConfig>,
    pub genie: Option<Arc<GenieClient>>,
    pub claude: Option<Arc<ClaudeClient>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn success(data: T, request_id: String) -> Self {
        Self {
            status: "success",
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            retrieved_at: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "database_unavailable" | "not_configured" => StatusCode::SERVICE_UNAVAILABLE,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &posdash_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// The pool, or a `database_unavailable` error for handlers that cannot
/// answer without one.
pub(super) fn require_pool<'a>(
    state: &'a AppState,
    request_id: &str,
) -> Result<&'a PgPool, ApiError> {
    state.pool.as_ref().ok_or_else(|| {
        ApiError::new(
            request_id,
            "database_unavailable",
            "database connection is not available",
        )
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
        .expose_headers(tower_http::cors::Any)
}

fn health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/database", get(health::database_health))
        .route("/health/claude", get(health::claude_health))
        .route("/diagnostic/oauth-test", get(health::oauth_test))
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/user", get(user::get_user))
        .route("/api/pos-data", get(user::get_pos_data))
        .route("/api/pos-submissions", get(submissions::list_pos_submissions))
        .route("/api/analytics", get(analytics::get_analytics_overview))
        .route("/api/analytics/volume", get(analytics::list_volume))
        .route("/api/analytics/competition", get(analytics::list_competition))
        .route("/api/analytics/pricing", get(analytics::list_pricing))
        .route("/api/analytics/summary", get(analytics::get_summary))
        .route("/api/dashboard/config", get(dashboard::get_dashboard_config))
        .route("/api/genie/config", get(genie::get_genie_config))
        .route(
            "/api/genie/conversations/start",
            post(genie::start_conversation),
        )
        .route(
            "/api/genie/conversations/{conversation_id}/messages",
            post(genie::send_followup),
        )
        .route(
            "/api/genie/conversations/{conversation_id}/messages/{message_id}",
            get(genie::get_message),
        )
        .route(
            "/api/genie/conversations/{conversation_id}/messages/{message_id}/query-result/{attachment_id}",
            get(genie::get_query_result),
        )
        .route(
            "/api/recommendations",
            post(recommendations::create_recommendations),
        )
}

/// CORS wraps the health and API routes only; the frontend router answers
/// its own manifest preflight.
pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(health_router())
        .merge(api_router())
        .layer(build_cors());

    Router::new()
        .merge(api)
        .merge(frontend::router(&state.config.static_root))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) fn test_state(static_root: std::path::PathBuf) -> AppState {
    use posdash_core::Environment;

    AppState {
        pool: None,
        config: Arc::new(AppConfig {
            env: Environment::Test,
            bind_addr: ([127, 0, 0, 1], 0).into(),
            log_level: "info".to_string(),
            static_root,
            database: None,
            dashboard: None,
            genie: None,
            claude_endpoint: None,
            http_timeout_secs: 5,
        }),
        genie: None,
        claude: None,
    }
}

#[cfg(test)]
pub(crate) async fn send(
    app: Router,
    request: axum::http::Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    use axum::body::to_bytes;
    use tower::ServiceExt;

    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("json parse")
    };
    (status, json)
}
