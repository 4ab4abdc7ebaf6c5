//! HTTP-facing errors.
//!
//! Every failure is answered with `{"error": "..."}`. Store and upstream
//! details are logged here and never echoed to the caller.

use agentembed_agent::AgentError;
use agentembed_store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Agent ID not specified")]
    AgentIdNotSpecified,

    #[error("Agent ID required")]
    AgentIdRequired,

    #[error("Message required")]
    MessageRequired,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The agent does not exist or is not public. Callers cannot tell which.
    #[error("Agent not available")]
    AgentUnavailable,

    #[error("Cerebras API key not configured")]
    ApiKeyNotConfigured,

    #[error("Upstream API error: {}", upstream_label(.0))]
    Upstream(AgentError),

    #[error("Internal server error")]
    Store(#[from] StoreError),
}

fn upstream_label(err: &AgentError) -> String {
    match err {
        AgentError::UpstreamStatus { status, .. } => status.to_string(),
        AgentError::LlmRequestFailed { .. } => "request failed".to_owned(),
        AgentError::LlmParseFailed { .. } | AgentError::Json(_) => "invalid response".to_owned(),
        AgentError::MissingApiKey { .. } => "not configured".to_owned(),
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::MissingApiKey { .. } => Self::ApiKeyNotConfigured,
            other => Self::Upstream(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AgentIdNotSpecified
            | Self::AgentIdRequired
            | Self::MessageRequired
            | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::AgentUnavailable => StatusCode::NOT_FOUND,
            Self::ApiKeyNotConfigured | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Upstream(err) => tracing::warn!(error = %err, "upstream completion failed"),
            Self::Store(err) => tracing::error!(error = %err, "store failure"),
            Self::ApiKeyNotConfigured => tracing::error!("chat requested without an api key"),
            _ => tracing::debug!(status = status.as_u16(), error = %self, "request rejected"),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
