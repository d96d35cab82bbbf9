use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::insights::{
    build_recommendations_prompt, claude_error_recommendation, mock_recommendations,
    parse_recommendations_reply, recommendations_summary, summarize_pos_records, MOCK_SUMMARY,
};
use crate::middleware::{ForwardedIdentity, RequestId};

use super::{AppState, ResponseMeta};

/// Recommendations sit at the top level where the dashboard reads them.
#[derive(Debug, Serialize)]
pub(super) struct RecommendationsResponse {
    recommendations: Vec<Value>,
    summary: String,
    generated_at: DateTime<Utc>,
    meta: ResponseMeta,
}

/// Strategic recommendations for the POS records the dashboard is showing.
///
/// Without a forwarded token the canned recommendations are returned so the
/// dashboard works locally. Claude failures are reported as a recommendation
/// rather than an HTTP error.
pub(super) async fn create_recommendations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    identity: ForwardedIdentity,
    Json(records): Json<Vec<Value>>,
) -> Json<RecommendationsResponse> {
    let meta = ResponseMeta::new(req_id.0);

    let Some(token) = identity.active_token() else {
        tracing::info!("no forwarded token, returning mock recommendations");
        return Json(RecommendationsResponse {
            recommendations: mock_recommendations(),
            summary: MOCK_SUMMARY.to_string(),
            generated_at: Utc::now(),
            meta,
        });
    };

    let pos_summary = summarize_pos_records(&records);
    let prompt = build_recommendations_prompt(&pos_summary);

    let recommendations = match state.claude.as_deref() {
        None => vec![claude_error_recommendation("endpoint not configured")],
        Some(claude) => match claude.invoke(token, &prompt).await {
            Ok(reply) => parse_recommendations_reply(&reply),
            Err(e) => {
                tracing::error!(error = %e, "claude recommendations failed");
                vec![claude_error_recommendation(&e.to_string())]
            }
        },
    };

    Json(RecommendationsResponse {
        recommendations,
        summary: recommendations_summary(&pos_summary),
        generated_at: Utc::now(),
        meta,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use posdash_databricks::ClaudeClient;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::{build_app, send, test_state};
    use super::*;

    fn post(records: &Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/recommendations")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("x-forwarded-access-token", token);
        }
        builder
            .body(Body::from(records.to_string()))
            .expect("request")
    }

    fn records() -> Value {
        json!([
            {"businessType": "Supermarket", "country": "France", "productFamilies": ["Waters"], "salesVolume": 1500},
            {"businessType": "Pharmacy", "country": "Spain", "productFamilies": [], "salesVolume": 500}
        ])
    }

    fn state_with_claude(server: &MockServer) -> AppState {
        let mut state = test_state(std::env::temp_dir());
        state.claude = Some(Arc::new(
            ClaudeClient::new(&server.uri(), 5).expect("claude client"),
        ));
        state
    }

    #[tokio::test]
    async fn mock_recommendations_without_token() {
        let app = build_app(test_state(std::env::temp_dir()));
        let (status, json) = send(app, post(&records(), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["recommendations"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["summary"], MOCK_SUMMARY);
        assert!(json["generated_at"].is_string());
    }

    #[tokio::test]
    async fn claude_reply_array_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer user-tok"))
            .and(body_partial_json(json!({"max_tokens": 1000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "[{\"type\":\"growth\",\"title\":\"Spain\"}]"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = build_app(state_with_claude(&server));
        let (status, json) = send(app, post(&records(), Some("user-tok"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["recommendations"][0]["title"], "Spain");
        assert_eq!(
            json["summary"],
            "Analysis of 2 POS locations across 2 countries"
        );
    }

    #[tokio::test]
    async fn claude_failure_becomes_error_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let app = build_app(state_with_claude(&server));
        let (status, json) = send(app, post(&records(), Some("user-tok"))).await;
        assert_eq!(status, StatusCode::OK);
        let item = &json["recommendations"][0];
        assert_eq!(item["type"], "error");
        assert!(item["description"].as_str().unwrap().contains("403"));
    }
}
