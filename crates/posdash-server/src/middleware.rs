use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

const USER_TOKEN_HEADER: &str = "x-forwarded-access-token";
const USER_EMAIL_HEADER: &str = "x-forwarded-user";
const TOKEN_PREFIX_CHARS: usize = 20;

/// Which credential the hosting platform forwarded with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlow {
    /// The end user's delegated token from `x-forwarded-access-token`.
    UserObo,
    /// The app's own token from `Authorization: Bearer`.
    ServicePrincipal,
    Unknown,
}

impl AuthFlow {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthFlow::UserObo => "user_obo",
            AuthFlow::ServicePrincipal => "service_principal",
            AuthFlow::Unknown => "unknown",
        }
    }
}

/// Identity headers set by the hosting platform's proxy. End users are
/// authenticated upstream; this service only reads what was forwarded.
#[derive(Debug, Clone, Default)]
pub struct ForwardedIdentity {
    pub user_token: Option<String>,
    pub bearer_token: Option<String>,
    pub user_email: Option<String>,
}

impl ForwardedIdentity {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };

        Self {
            user_token: text(USER_TOKEN_HEADER),
            bearer_token: extract_bearer_token(headers.get(AUTHORIZATION)).map(ToOwned::to_owned),
            user_email: text(USER_EMAIL_HEADER),
        }
    }

    /// The user token wins over the service principal token.
    #[must_use]
    pub fn flow(&self) -> AuthFlow {
        if self.user_token.is_some() {
            AuthFlow::UserObo
        } else if self.bearer_token.is_some() {
            AuthFlow::ServicePrincipal
        } else {
            AuthFlow::Unknown
        }
    }

    #[must_use]
    pub fn active_token(&self) -> Option<&str> {
        self.user_token
            .as_deref()
            .or(self.bearer_token.as_deref())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ForwardedIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// First 20 characters followed by `...`; `None` for tokens that short.
#[must_use]
pub fn token_prefix(token: &str) -> Option<String> {
    token
        .char_indices()
        .nth(TOKEN_PREFIX_CHARS)
        .map(|(cut, _)| format!("{}...", &token[..cut]))
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
