//! Agent error types.
//!
//! Everything that talks to the upstream completion API surfaces errors
//! through [`AgentError`].

/// Unified error type for the completion client.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The HTTP request could not be sent or did not complete (includes
    /// timeouts).
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The upstream API answered with a non-2xx status.
    #[error("llm api returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The response body could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}
