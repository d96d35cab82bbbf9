//! Client for the Claude chat-completions serving endpoint.
//!
//! Requests are made with the caller's own bearer token so model access is
//! governed by the end user's permissions.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;

use crate::error::DatabricksError;
use crate::read_json;

/// Returned when the endpoint answers 2xx without any message content.
pub const FALLBACK_REPLY: &str = "Unable to generate recommendations";

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
}

pub struct ClaudeClient {
    client: Client,
    endpoint: Url,
}

impl ClaudeClient {
    /// # Errors
    ///
    /// Returns [`DatabricksError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`DatabricksError::InvalidUrl`] for an unparseable endpoint.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, DatabricksError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let endpoint =
            Url::parse(endpoint).map_err(|_| DatabricksError::InvalidUrl(endpoint.to_string()))?;
        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Sends `prompt` as a single user message and returns the reply text.
    ///
    /// # Errors
    ///
    /// - [`DatabricksError::UnexpectedStatus`] on a non-2xx reply (403 when
    ///   the token lacks serving-endpoint scope or query permission).
    /// - [`DatabricksError::Http`] on network failure or timeout.
    /// - [`DatabricksError::Deserialize`] if the reply is not JSON.
    pub async fn invoke(&self, token: &str, prompt: &str) -> Result<String, DatabricksError> {
        let payload = ChatRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::info!(
            endpoint = %self.endpoint,
            prompt_chars = prompt.chars().count(),
            "calling claude endpoint"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let body = match read_json(response, "claude invocation").await {
            Ok(body) => body,
            Err(DatabricksError::UnexpectedStatus { status, body }) => {
                tracing::error!(status, body = %body, "claude endpoint rejected request");
                return Err(DatabricksError::UnexpectedStatus { status, body });
            }
            Err(e) => return Err(e),
        };

        let content = reply_text(&body);
        tracing::info!(reply_chars = content.chars().count(), "claude endpoint replied");
        Ok(content)
    }
}

/// Extracts `choices[0].message.content`, defaulting to [`FALLBACK_REPLY`].
fn reply_text(body: &Value) -> String {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_REPLY)
        .to_string()
}
