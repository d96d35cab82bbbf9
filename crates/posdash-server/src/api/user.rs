use axum::{Extension, Json};
use serde::Serialize;

use crate::middleware::{ForwardedIdentity, RequestId};

use super::{ApiError, ApiResponse};

#[derive(Debug, Serialize)]
pub(super) struct UserInfo {
    authenticated: bool,
    user_email: String,
    has_token: bool,
}

pub(super) async fn get_user(identity: ForwardedIdentity) -> Json<UserInfo> {
    let user_email = identity
        .user_email
        .unwrap_or_else(|| "anonymous".to_string());
    tracing::info!(user = %user_email, "user info requested");

    let has_token = identity.user_token.is_some();
    Json(UserInfo {
        authenticated: has_token,
        user_email,
        has_token,
    })
}

#[derive(Debug, Serialize)]
pub(super) struct PosDataStatus {
    message: &'static str,
    data_source: &'static str,
}

/// Readiness probe for the user-scoped data path.
pub(super) async fn get_pos_data(
    Extension(req_id): Extension<RequestId>,
    identity: ForwardedIdentity,
) -> Result<Json<ApiResponse<PosDataStatus>>, ApiError> {
    if identity.user_token.is_none() {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "Authentication required",
        ));
    }

    Ok(Json(ApiResponse::success(
        PosDataStatus {
            message: "POS data endpoint ready for integration",
            data_source: "sample_data",
        },
        req_id.0,
    )))
}
