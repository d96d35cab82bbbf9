//! Genie conversation proxy. Upstream bodies are forwarded untouched inside
//! the success envelope.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use posdash_databricks::{DatabricksError, GenieClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct GenieConfigData {
    space_id: String,
    instance_url: String,
    space_url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentBody {
    #[serde(default)]
    content: String,
}

type GenieResult = Result<Json<ApiResponse<Value>>, ApiError>;

pub(super) async fn get_genie_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<GenieConfigData>>, ApiError> {
    let Some(genie) = state.config.genie.as_ref() else {
        return Err(not_configured(req_id.0));
    };

    Ok(Json(ApiResponse::success(
        GenieConfigData {
            space_id: genie.space_id.clone(),
            instance_url: genie.instance_url.clone(),
            space_url: genie.space_url(),
        },
        req_id.0,
    )))
}

fn not_configured(request_id: String) -> ApiError {
    ApiError::new(request_id, "not_configured", "Genie is not configured")
}

fn client<'a>(state: &'a AppState, request_id: &str) -> Result<&'a GenieClient, ApiError> {
    state
        .genie
        .as_deref()
        .ok_or_else(|| not_configured(request_id.to_string()))
}

fn require_content<'a>(body: &'a ContentBody, request_id: &str) -> Result<&'a str, ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "Content is required",
        ));
    }
    Ok(content)
}

fn map_genie_error(request_id: String, op: &str, error: &DatabricksError) -> ApiError {
    tracing::error!(op, error = %error, "genie request failed");
    let message = match error.status() {
        Some(status) => format!("Genie API error: {status}"),
        None => format!("Genie API unreachable: {error}"),
    };
    ApiError::new(request_id, "upstream_error", message)
}

fn respond(
    request_id: String,
    op: &str,
    result: Result<Value, DatabricksError>,
) -> GenieResult {
    match result {
        Ok(body) => Ok(Json(ApiResponse::success(body, request_id))),
        Err(e) => Err(map_genie_error(request_id, op, &e)),
    }
}

pub(super) async fn start_conversation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ContentBody>,
) -> GenieResult {
    let content = require_content(&body, &req_id.0)?;
    let genie = client(&state, &req_id.0)?;
    let result = genie.start_conversation(content).await;
    respond(req_id.0, "start-conversation", result)
}

pub(super) async fn get_message(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((conversation_id, message_id)): Path<(String, String)>,
) -> GenieResult {
    let genie = client(&state, &req_id.0)?;
    let result = genie.get_message(&conversation_id, &message_id).await;
    respond(req_id.0, "get-message", result)
}

pub(super) async fn get_query_result(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((conversation_id, message_id, attachment_id)): Path<(String, String, String)>,
) -> GenieResult {
    let genie = client(&state, &req_id.0)?;
    let result = genie
        .get_query_result(&conversation_id, &message_id, &attachment_id)
        .await;
    respond(req_id.0, "get-query-result", result)
}

pub(super) async fn send_followup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(conversation_id): Path<String>,
    Json(body): Json<ContentBody>,
) -> GenieResult {
    let content = require_content(&body, &req_id.0)?;
    let genie = client(&state, &req_id.0)?;
    let result = genie.send_followup(&conversation_id, content).await;
    respond(req_id.0, "send-followup", result)
}
