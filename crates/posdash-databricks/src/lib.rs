//! HTTP clients for the Databricks services the dashboard talks to: the
//! Genie conversation API and the Claude model-serving endpoint.

pub mod claude;
pub mod error;
pub mod genie;

pub use claude::{ClaudeClient, FALLBACK_REPLY};
pub use error::DatabricksError;
pub use genie::GenieClient;

/// Reads a response body and fails with [`DatabricksError::UnexpectedStatus`]
/// on any non-2xx status, keeping the upstream body for logging.
pub(crate) async fn read_json(
    response: reqwest::Response,
    context: &str,
) -> Result<serde_json::Value, DatabricksError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(DatabricksError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| DatabricksError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}
