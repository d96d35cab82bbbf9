//! Liveness plus the database and Claude authentication diagnostics.
//!
//! These endpoints answer 200 with a diagnostic body even when a check
//! fails, so operators can read what went wrong.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use posdash_databricks::{ClaudeClient, DatabricksError};
use posdash_db::{DatabaseProbe, ProbeStatus};
use serde::Serialize;
use serde_json::{json, Value};

use crate::insights::truncate_chars;
use crate::middleware::{token_prefix, AuthFlow, ForwardedIdentity};

use super::{AppState, APP_NAME};

const DEFAULT_SCHEMA: &str = "public";
const HEALTH_PROMPT: &str = "Hello, please respond with 'Claude is working'";

#[derive(Debug, Serialize)]
pub(super) struct Liveness {
    status: &'static str,
    app: &'static str,
}

pub(super) async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        status: "healthy",
        app: APP_NAME,
    })
}

#[derive(Debug, Serialize)]
pub(super) struct DatabaseHealth {
    timestamp: DateTime<Utc>,
    database: DatabaseProbe,
    overall_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

fn probe_message(status: ProbeStatus) -> Option<&'static str> {
    match status {
        ProbeStatus::NoConnectionPool => {
            Some("Database connection pool not initialized - using sample data")
        }
        ProbeStatus::ConnectionFailed => Some("Database connection failed - using sample data"),
        ProbeStatus::Healthy | ProbeStatus::Partial => None,
    }
}

pub(super) async fn database_health(State(state): State<AppState>) -> Json<DatabaseHealth> {
    let schema = state
        .config
        .database
        .as_ref()
        .map_or(DEFAULT_SCHEMA, |db| db.schema.as_str());
    let probe = posdash_db::probe_database(state.pool.as_ref(), schema).await;

    Json(DatabaseHealth {
        timestamp: Utc::now(),
        overall_status: if probe.is_healthy() {
            "healthy"
        } else {
            "degraded"
        },
        message: probe_message(probe.status),
        database: probe,
    })
}

/// Names of headers that look authentication-related. Values are never
/// echoed.
fn auth_related_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .keys()
        .map(|name| name.as_str().to_string())
        .filter(|name| ["auth", "token", "forward"].iter().any(|k| name.contains(k)))
        .collect()
}

fn forbidden_analysis(flow: AuthFlow) -> Value {
    json!({
        "likely_causes": [
            "Missing 'serving.serving-endpoints' or 'all-apis' OAuth scope",
            "User token lacks 'Can Query' permission on Claude endpoint",
            "Stale OAuth scopes - app needs restart and user re-consent",
            "Service principal lacks proper endpoint permissions",
        ],
        "immediate_actions": [
            "Check app OAuth configuration in Databricks workspace",
            "Verify user has 'Can Query' access to the Claude serving endpoint",
            "Try restarting app and clearing browser cache/cookies",
            "Test with different user or service principal",
        ],
        "auth_flow_specific": {
            (flow.as_str()): "Current authentication method - verify permissions for this specific flow",
        },
    })
}

fn claude_failure(error: &DatabricksError, flow: AuthFlow) -> (&'static str, Value) {
    match error {
        DatabricksError::UnexpectedStatus { status, body } => {
            let mut detail = json!({
                "status_code": status,
                "error_type": "unexpected_status",
                "error_message": error.to_string(),
                "response_text": body,
            });
            if *status == 403 {
                detail["databricks_403_analysis"] = forbidden_analysis(flow);
            }
            ("http_error", detail)
        }
        other => (
            "connection_error",
            json!({
                "error_type": "connection_error",
                "error_message": other.to_string(),
                "troubleshooting": [
                    "Verify Claude endpoint URL is correct",
                    "Check network connectivity from Databricks Apps",
                    "Confirm endpoint is active and accepting requests",
                ],
            }),
        ),
    }
}

pub(super) async fn claude_health(
    State(state): State<AppState>,
    identity: ForwardedIdentity,
    headers: HeaderMap,
) -> Json<Value> {
    let flow = identity.flow();
    let token = identity.active_token();

    let mut result = json!({
        "timestamp": Utc::now(),
        "claude_endpoint": state.claude.as_deref().map(ClaudeClient::endpoint),
        "authentication_analysis": {
            "flow_type": flow,
            "token_present": token.is_some(),
            "token_length": token.map_or(0, str::len),
            "token_prefix": token.and_then(token_prefix),
            "user_obo_header": identity.user_token.is_some(),
            "service_principal_header": identity.bearer_token.is_some(),
        },
        "headers_analysis": {
            "total_headers": headers.len(),
            "auth_related_headers": auth_related_headers(&headers),
        },
        "databricks_troubleshooting": {
            "step_1_auth_flow": format!("Using {} authentication flow", flow.as_str()),
            "step_2_oauth_scopes": "Check if app has 'serving.serving-endpoints' or 'all-apis' scope",
            "step_3_permissions": "Verify 'Can Query' permission on Claude endpoint",
            "step_4_logs": "Check workspace audit logs for 'serverlessRealTimeInference' events",
        },
        "status": "diagnostics_complete",
    });

    let Some(token) = token else {
        result["status"] = json!("no_token");
        result["error"] = json!("No authentication token found in any expected headers");
        result["next_steps"] = json!([
            "Verify app OAuth configuration includes required scopes",
            "Check if user needs to re-consent to app permissions",
            "Ensure app is properly deployed with authentication enabled",
        ]);
        return Json(result);
    };

    let Some(claude) = state.claude.as_deref() else {
        result["status"] = json!("not_configured");
        result["error"] = json!("Claude endpoint is not configured");
        return Json(result);
    };

    tracing::info!(flow = flow.as_str(), "testing claude connectivity");
    match claude.invoke(token, HEALTH_PROMPT).await {
        Ok(reply) => {
            result["status"] = json!("success");
            result["claude_test"] = json!({
                "response_received": true,
                "response_length": reply.chars().count(),
                "response_preview": truncate_chars(&reply, 200),
            });
            result["message"] = json!(format!(
                "Claude endpoint accessible via {} authentication",
                flow.as_str()
            ));
        }
        Err(e) => {
            tracing::warn!(error = %e, flow = flow.as_str(), "claude health test failed");
            let (status, detail) = claude_failure(&e, flow);
            result["status"] = json!(status);
            result["error"] = detail;
        }
    }

    Json(result)
}

/// Tests one authentication flow against Claude, or reports it absent.
async fn flow_test(
    claude: Option<&ClaudeClient>,
    token: Option<&str>,
    flow: AuthFlow,
) -> Value {
    let (description, requirements, missing, absent, prompt, troubleshooting) = match flow {
        AuthFlow::UserObo => (
            "Using user's delegated token (x-forwarded-access-token)",
            [
                "User must have 'Can Query' permission on Claude endpoint",
                "App OAuth config must include 'serving.serving-endpoints' or 'all-apis' scope",
            ],
            "No x-forwarded-access-token header found",
            "App is not using user delegation (OBO) flow",
            "Test: OAuth scope validation",
            [
                "Check user's 'Can Query' permission on the Claude serving endpoint",
                "Verify app OAuth scopes include required permissions",
                "Try user re-consent to app",
            ],
        ),
        AuthFlow::ServicePrincipal | AuthFlow::Unknown => (
            "Using app's service principal token (Authorization header)",
            [
                "Service principal must have 'Can Query' permission on Claude endpoint",
                "App must be configured to use service principal authentication",
            ],
            "No Authorization: Bearer header found",
            "App is not using service principal authentication",
            "Test: Service principal access",
            [
                "Check service principal permissions on the Claude serving endpoint",
                "Verify app deployment configuration",
                "Check app OAuth configuration",
            ],
        ),
    };

    let Some(token) = token else {
        return json!({
            "available": false,
            "description": missing,
            "implications": absent,
        });
    };

    let claude_test = match claude {
        None => json!({ "status": "skipped", "error": "Claude endpoint is not configured" }),
        Some(client) => {
            tracing::info!(flow = flow.as_str(), "testing claude access");
            match client.invoke(token, prompt).await {
                Ok(reply) => json!({
                    "status": "success",
                    "response_preview": truncate_chars(&reply, 100),
                }),
                Err(e) => json!({
                    "status": "failed",
                    "error": e.to_string(),
                    "troubleshooting": troubleshooting,
                }),
            }
        }
    };

    json!({
        "available": true,
        "token_length": token.len(),
        "token_prefix": token_prefix(token),
        "description": description,
        "requirements": requirements,
        "claude_test": claude_test,
    })
}

/// Advice depending on which flows carried a token.
fn oauth_recommendation(user_available: bool, sp_available: bool) -> Value {
    let (priority, action, steps): (&str, &str, &[&str]) = match (user_available, sp_available) {
        (false, false) => (
            "high",
            "No valid authentication tokens found",
            &[
                "Check app OAuth configuration in Databricks workspace",
                "Verify app deployment includes authentication setup",
                "Ensure proper scopes are configured",
                "Try restarting the app",
            ],
        ),
        (true, false) => (
            "medium",
            "Using user delegation (OBO) flow only",
            &[
                "This is normal for user-facing apps",
                "Focus on user permissions and OAuth scopes",
                "Verify 'serving.serving-endpoints' scope is included",
            ],
        ),
        (false, true) => (
            "medium",
            "Using service principal flow only",
            &[
                "This is normal for backend-only apps",
                "Focus on service principal permissions",
                "Verify service principal has Claude endpoint access",
            ],
        ),
        (true, true) => (
            "low",
            "Both authentication flows available",
            &[
                "Compare test results to identify which flow is failing",
                "Focus troubleshooting on the failing authentication method",
                "Consider using the working method as primary",
            ],
        ),
    };
    json!({ "priority": priority, "action": action, "steps": steps })
}

pub(super) async fn oauth_test(
    State(state): State<AppState>,
    identity: ForwardedIdentity,
) -> Json<Value> {
    let claude = state.claude.as_deref();
    let user_flow = flow_test(claude, identity.user_token.as_deref(), AuthFlow::UserObo).await;
    let sp_flow = flow_test(
        claude,
        identity.bearer_token.as_deref(),
        AuthFlow::ServicePrincipal,
    )
    .await;

    Json(json!({
        "timestamp": Utc::now(),
        "test_summary": "OAuth scope and authentication flow testing",
        "databricks_recommendations": {
            "step_1": "Triple-check Authentication Flow and Identity",
            "step_2": "Validate OAuth Scopes (serving.serving-endpoints or all-apis)",
            "step_3": "Check Behavior Using Both Auth Flows",
            "step_4": "Look at Workspace/Endpoint Logs",
        },
        "recommendation": oauth_recommendation(
            identity.user_token.is_some(),
            identity.bearer_token.is_some(),
        ),
        "tests": {
            "user_obo_flow": user_flow,
            "service_principal_flow": sp_flow,
        },
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::{build_app, send, test_state};
    use super::*;

    fn get_req(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).expect("request")
    }

    fn state_with_claude(endpoint: &str) -> AppState {
        let mut state = test_state(std::env::temp_dir());
        state.claude = Some(std::sync::Arc::new(
            ClaudeClient::new(endpoint, 5).expect("claude client"),
        ));
        state
    }

    #[tokio::test]
    async fn liveness_reports_app_name() {
        let app = build_app(test_state(std::env::temp_dir()));
        let (status, json) = send(app, get_req("/health", &[])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["app"], "Danone POS Analytics");
    }

    #[tokio::test]
    async fn database_health_without_pool_is_degraded() {
        let app = build_app(test_state(std::env::temp_dir()));
        let (status, json) = send(app, get_req("/health/database", &[])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["overall_status"], "degraded");
        assert_eq!(json["database"]["status"], "no_connection_pool");
        assert_eq!(json["database"]["pool_status"], false);
        assert!(json["message"].as_str().unwrap().contains("sample data"));
    }

    #[tokio::test]
    async fn claude_health_without_token_lists_next_steps() {
        let app = build_app(test_state(std::env::temp_dir()));
        let (_, json) = send(app, get_req("/health/claude", &[])).await;
        assert_eq!(json["status"], "no_token");
        assert_eq!(json["authentication_analysis"]["flow_type"], "unknown");
        assert_eq!(json["next_steps"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn claude_health_never_echoes_header_values() {
        let app = build_app(test_state(std::env::temp_dir()));
        let token = "dapi-0123456789abcdefghijklmnop";
        let (_, json) = send(
            app,
            get_req("/health/claude", &[("x-forwarded-access-token", token)]),
        )
        .await;

        let analysis = &json["authentication_analysis"];
        assert_eq!(analysis["flow_type"], "user_obo");
        assert_eq!(analysis["token_length"], token.len());
        assert_eq!(analysis["token_prefix"], "dapi-0123456789abcde...");
        assert_eq!(
            json["headers_analysis"]["auth_related_headers"],
            json!(["x-forwarded-access-token"])
        );
        assert!(!json.to_string().contains(token));
        assert_eq!(json["status"], "not_configured");
    }

    #[tokio::test]
    async fn claude_health_reports_forbidden_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invocations"))
            .and(header("authorization", "Bearer sp-token"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let app = build_app(state_with_claude(&format!("{}/invocations", server.uri())));
        let (_, json) = send(
            app,
            get_req("/health/claude", &[("authorization", "Bearer sp-token")]),
        )
        .await;

        assert_eq!(json["status"], "http_error");
        assert_eq!(json["error"]["status_code"], 403);
        assert_eq!(json["error"]["response_text"], "PERMISSION_DENIED");
        assert!(json["error"]["databricks_403_analysis"]["auth_flow_specific"]
            ["service_principal"]
            .is_string());
    }

    #[tokio::test]
    async fn claude_health_success_previews_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Claude is working"}}]
            })))
            .mount(&server)
            .await;

        let app = build_app(state_with_claude(&server.uri()));
        let (_, json) = send(
            app,
            get_req("/health/claude", &[("x-forwarded-access-token", "u")]),
        )
        .await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["claude_test"]["response_preview"], "Claude is working");
    }

    #[tokio::test]
    async fn oauth_test_covers_each_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sp-token"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let app = build_app(state_with_claude(&server.uri()));
        let (_, json) = send(
            app,
            get_req(
                "/diagnostic/oauth-test",
                &[
                    ("x-forwarded-access-token", "user-token"),
                    ("authorization", "Bearer sp-token"),
                ],
            ),
        )
        .await;

        let tests = &json["tests"];
        assert_eq!(tests["user_obo_flow"]["claude_test"]["status"], "success");
        assert_eq!(
            tests["service_principal_flow"]["claude_test"]["status"],
            "failed"
        );
        assert_eq!(json["recommendation"]["priority"], "low");
    }

    #[test]
    fn recommendation_priority_follows_available_flows() {
        assert_eq!(oauth_recommendation(false, false)["priority"], "high");
        assert_eq!(
            oauth_recommendation(true, false)["action"],
            "Using user delegation (OBO) flow only"
        );
        assert_eq!(
            oauth_recommendation(false, true)["action"],
            "Using service principal flow only"
        );
    }

    #[test]
    fn auth_header_filter_matches_names() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "x".parse().unwrap());
        headers.insert("x-forwarded-user", "x".parse().unwrap());
        headers.insert("accept", "x".parse().unwrap());
        let mut names = auth_related_headers(&headers);
        names.sort();
        assert_eq!(names, vec!["authorization", "x-forwarded-user"]);
    }
}
