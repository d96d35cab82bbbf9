//! Client for the Genie conversation API of one configured space.
//!
//! Responses are passed back as opaque JSON; the frontend understands the
//! Genie message shape, this service does not need to.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde_json::{json, Value};

use crate::error::DatabricksError;
use crate::read_json;

const API_BASE: &[&str] = &["api", "2.0", "genie", "spaces"];
const QUERY_RESULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GenieClient {
    client: Client,
    token: String,
    /// `{instance}/api/2.0/genie/spaces/{space}` with no trailing slash.
    space_url: Url,
}

impl GenieClient {
    /// Creates a client for `space_id` on the given workspace instance.
    ///
    /// # Errors
    ///
    /// Returns [`DatabricksError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`DatabricksError::InvalidUrl`] if
    /// `instance_url` is not an absolute http(s) URL.
    pub fn new(
        instance_url: &str,
        space_id: &str,
        token: &str,
        timeout_secs: u64,
    ) -> Result<Self, DatabricksError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let mut space_url = Url::parse(instance_url.trim_end_matches('/'))
            .map_err(|_| DatabricksError::InvalidUrl(instance_url.to_string()))?;
        space_url
            .path_segments_mut()
            .map_err(|()| DatabricksError::InvalidUrl(instance_url.to_string()))?
            .pop_if_empty()
            .extend(API_BASE)
            .push(space_id);

        Ok(Self {
            client,
            token: token.to_owned(),
            space_url,
        })
    }

    /// Starts a new conversation with `content` as the first question.
    ///
    /// # Errors
    ///
    /// - [`DatabricksError::UnexpectedStatus`] on a non-2xx reply.
    /// - [`DatabricksError::Http`] on network failure or timeout.
    /// - [`DatabricksError::Deserialize`] if the reply is not JSON.
    pub async fn start_conversation(&self, content: &str) -> Result<Value, DatabricksError> {
        let url = self.endpoint(&["start-conversation"]);
        let request = self.client.post(url).json(&json!({ "content": content }));
        self.send(request, "start-conversation").await
    }

    /// Fetches one message, including its status and attachments.
    ///
    /// # Errors
    ///
    /// Same as [`GenieClient::start_conversation`].
    pub async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Value, DatabricksError> {
        let url = self.endpoint(&["conversations", conversation_id, "messages", message_id]);
        self.send(self.client.get(url), "get-message").await
    }

    /// Fetches the SQL result behind a message attachment. Allowed up to 60 s.
    ///
    /// # Errors
    ///
    /// Same as [`GenieClient::start_conversation`].
    pub async fn get_query_result(
        &self,
        conversation_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Value, DatabricksError> {
        let url = self.endpoint(&[
            "conversations",
            conversation_id,
            "messages",
            message_id,
            "query-result",
            attachment_id,
        ]);
        let request = self.client.get(url).timeout(QUERY_RESULT_TIMEOUT);
        self.send(request, "get-query-result").await
    }

    /// Posts a follow-up question to an existing conversation.
    ///
    /// # Errors
    ///
    /// Same as [`GenieClient::start_conversation`].
    pub async fn send_followup(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<Value, DatabricksError> {
        let url = self.endpoint(&["conversations", conversation_id, "messages"]);
        let request = self.client.post(url).json(&json!({ "content": content }));
        self.send(request, "send-followup").await
    }

    /// Appends percent-encoded path segments to the space URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.space_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder, op: &str) -> Result<Value, DatabricksError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let result = read_json(response, op).await;
        if let Err(DatabricksError::UnexpectedStatus { status, body }) = &result {
            tracing::error!(op, status, body = %body, "genie API error");
        }
        result
    }
}
