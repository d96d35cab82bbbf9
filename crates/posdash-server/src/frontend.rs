//! Static serving for the built single-page app.
//!
//! Hashed assets live under `<static_root>/static`; everything else that no
//! API route claims falls back to a file in the static root, then to
//! `index.html` so client-side routes resolve.

use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::api::{ApiError, AppState};
use crate::middleware::RequestId;

const STATIC_MANIFEST: &str = r##"{"name":"Danone POS Analytics","short_name":"Danone POS","theme_color":"#0066cc","background_color":"#ffffff","display":"standalone","start_url":"/"}"##;

const MANIFEST_CORS: &[(&str, &str)] = &[
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, HEAD, OPTIONS"),
    ("access-control-allow-headers", "*"),
    ("access-control-expose-headers", "*"),
    ("access-control-allow-credentials", "false"),
    ("x-public-resource", "true"),
];

pub fn router(static_root: &Path) -> Router<AppState> {
    Router::new()
        .route("/", get(spa_fallback))
        .route("/manifest.json", get(manifest).options(manifest_preflight))
        .route("/public/manifest.json", get(public_manifest))
        .route("/static-manifest.json", get(static_manifest))
        .route("/favicon.ico", get(favicon))
        .route("/asset-manifest.json", get(asset_manifest))
        .route("/debug/manifest", get(debug_manifest))
        .nest_service("/static", ServeDir::new(static_root.join("static")))
        .fallback(spa_fallback)
}

async fn serve_file(path: &Path, req: Request) -> Response {
    match ServeFile::new(path).oneshot(req).await {
        Ok(res) => res.map(Body::new),
        Err(never) => match never {},
    }
}

fn with_headers(mut res: Response, headers: &[(&'static str, &'static str)]) -> Response {
    for (name, value) in headers {
        res.headers_mut().insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    res
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

/// Joins a request path onto `root`, refusing anything but plain segments.
fn resolve_under(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn missing(request_id: String, what: &str) -> Response {
    ApiError::new(request_id, "not_found", format!("{what} not found")).into_response()
}

/// Serves a named file from the static root with extra headers, or 404.
async fn named_file(
    state: &AppState,
    req: Request,
    file: &str,
    headers: &[(&'static str, &'static str)],
    request_id: String,
    what: &str,
) -> Response {
    let path = state.config.static_root.join(file);
    if !is_file(&path).await {
        return missing(request_id, what);
    }
    with_headers(serve_file(&path, req).await, headers)
}

async fn manifest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
) -> Response {
    let mut headers = vec![
        ("content-type", "application/json"),
        ("cache-control", "public, max-age=3600"),
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "SAMEORIGIN"),
    ];
    headers.extend_from_slice(MANIFEST_CORS);
    named_file(&state, req, "manifest.json", &headers, req_id.0, "Manifest").await
}

async fn manifest_preflight() -> Response {
    let res = StatusCode::OK.into_response();
    let res = with_headers(res, MANIFEST_CORS);
    with_headers(res, &[("access-control-max-age", "86400")])
}

async fn public_manifest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
) -> Response {
    let headers = [
        ("content-type", "application/json"),
        ("cache-control", "public, max-age=3600"),
        ("access-control-allow-origin", "*"),
        ("x-public-resource", "true"),
    ];
    named_file(&state, req, "manifest.json", &headers, req_id.0, "Manifest").await
}

async fn static_manifest() -> Response {
    let res = (
        [(header::CONTENT_TYPE, "application/json")],
        STATIC_MANIFEST,
    )
        .into_response();
    with_headers(
        res,
        &[
            ("access-control-allow-origin", "*"),
            ("access-control-allow-methods", "*"),
            ("access-control-allow-headers", "*"),
            ("cache-control", "public, max-age=3600"),
            ("x-public-endpoint", "true"),
        ],
    )
}

async fn favicon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
) -> Response {
    let headers = [("access-control-allow-origin", "*")];
    named_file(&state, req, "favicon.ico", &headers, req_id.0, "Favicon").await
}

async fn asset_manifest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
) -> Response {
    let headers = [
        ("content-type", "application/json"),
        ("access-control-allow-origin", "*"),
    ];
    named_file(
        &state,
        req,
        "asset-manifest.json",
        &headers,
        req_id.0,
        "Asset manifest",
    )
    .await
}

async fn debug_manifest(State(state): State<AppState>) -> Json<serde_json::Value> {
    let root = &state.config.static_root;
    let manifest_path = root.join("manifest.json");
    Json(json!({
        "manifest_exists": is_file(&manifest_path).await,
        "manifest_path": manifest_path.display().to_string(),
        "static_root": root.display().to_string(),
        "timestamp": Utc::now(),
        "note": "This endpoint helps debug manifest.json accessibility",
    }))
}

/// File from the static root, else `index.html`, else a JSON notice that
/// the frontend has not been built. Unknown `/api` paths get a JSON 404.
async fn spa_fallback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
) -> Response {
    let request_path = req.uri().path().to_owned();
    if request_path == "/api" || request_path.starts_with("/api/") {
        return missing(req_id.0, "API route");
    }

    let root = &state.config.static_root;
    if let Some(candidate) = resolve_under(root, &request_path) {
        if is_file(&candidate).await {
            return serve_file(&candidate, req).await;
        }
    }

    let index = root.join("index.html");
    if is_file(&index).await {
        return serve_file(&index, req).await;
    }

    tracing::debug!(path = %request_path, "frontend build missing");
    Json(json!({
        "message": "Danone POS Analytics API",
        "status": "Frontend not built",
        "instructions": "Please run 'npm run build' in the frontend directory",
    }))
    .into_response()
}
