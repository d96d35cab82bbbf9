//! Integration tests for `GenieClient` using wiremock HTTP mocks.

use posdash_databricks::{DatabricksError, GenieClient};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> GenieClient {
    GenieClient::new(base_url, "space-42", "genie-token", 30)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn start_conversation_posts_content_with_bearer_token() {
    let server = MockServer::start().await;

    let reply = serde_json::json!({
        "conversation_id": "c-1",
        "message_id": "m-1",
        "message": {"status": "IN_PROGRESS"}
    });

    Mock::given(method("POST"))
        .and(path("/api/2.0/genie/spaces/space-42/start-conversation"))
        .and(header("authorization", "Bearer genie-token"))
        .and(body_json(serde_json::json!({"content": "Top regions last month?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let body = client
        .start_conversation("Top regions last month?")
        .await
        .expect("should return body");

    assert_eq!(body, reply);
}

#[tokio::test]
async fn get_message_passes_body_through() {
    let server = MockServer::start().await;

    let reply = serde_json::json!({
        "id": "m-1",
        "status": "COMPLETED",
        "attachments": [{"attachment_id": "a-1", "query": {"query": "SELECT 1"}}]
    });

    Mock::given(method("GET"))
        .and(path(
            "/api/2.0/genie/spaces/space-42/conversations/c-1/messages/m-1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .mount(&server)
        .await;

    let body = test_client(&server.uri())
        .get_message("c-1", "m-1")
        .await
        .expect("should return body");

    assert_eq!(body["attachments"][0]["attachment_id"], "a-1");
}

#[tokio::test]
async fn get_query_result_hits_attachment_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/api/2.0/genie/spaces/space-42/conversations/c-1/messages/m-1/query-result/a-9",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"statement_response": {"result": {"row_count": 3}}})),
        )
        .mount(&server)
        .await;

    let body = test_client(&server.uri())
        .get_query_result("c-1", "m-1", "a-9")
        .await
        .expect("should return body");

    assert_eq!(body["statement_response"]["result"]["row_count"], 3);
}

#[tokio::test]
async fn send_followup_posts_to_conversation_messages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/genie/spaces/space-42/conversations/c-7/messages"))
        .and(body_json(serde_json::json!({"content": "And by country?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = test_client(&server.uri())
        .send_followup("c-7", "And by country?")
        .await
        .expect("should return body");

    assert_eq!(body["id"], "m-2");
}

#[tokio::test]
async fn non_success_status_keeps_upstream_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("space not found"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .get_message("c-1", "m-1")
        .await
        .expect_err("404 should fail");

    assert_eq!(err.status(), Some(404));
    match err {
        DatabricksError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "space not found");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .start_conversation("hi")
        .await
        .expect_err("html body should fail");

    assert!(matches!(err, DatabricksError::Deserialize { .. }));
}
