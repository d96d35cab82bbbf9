use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

/// Everything the frontend needs to embed the BI dashboard, including the
/// embed token.
#[derive(Debug, Serialize)]
pub(super) struct DashboardConfigData {
    instance_url: String,
    workspace_id: String,
    dashboard_id: String,
    token: String,
    embed_url: String,
}

pub(super) async fn get_dashboard_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<DashboardConfigData>>, ApiError> {
    let Some(dashboard) = state.config.dashboard.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            "not_configured",
            "dashboard embedding is not configured",
        ));
    };

    Ok(Json(ApiResponse::success(
        DashboardConfigData {
            instance_url: dashboard.instance_url.clone(),
            workspace_id: dashboard.workspace_id.clone(),
            dashboard_id: dashboard.dashboard_id.clone(),
            token: dashboard.token.clone(),
            embed_url: dashboard.embed_url(),
        },
        req_id.0,
    )))
}
