//! Chat-completions client.
//!
//! Talks to any **OpenAI-compatible Chat Completions API**; the default
//! target is Cerebras. Only the non-streaming mode is used: one request,
//! one full JSON response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::types::{ChatRequest, Completion, DEFAULT_MAX_TOKENS};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default Cerebras API base URL.
pub const CEREBRAS_BASE_URL: &str = "https://api.cerebras.ai/v1";

/// Default Cerebras model.
pub const CEREBRAS_DEFAULT_MODEL: &str = "llama3.1-8b";

/// Upper bound on a single upstream call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Anything that can turn a [`ChatRequest`] into a [`Completion`].
///
/// The embed server depends on this trait rather than on [`LlmClient`] so
/// tests can script the upstream.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion>;
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for a single upstream endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Provider label, used in logs and errors.
    pub provider: String,
    pub api_key: String,
    /// Base URL for the API (e.g. `https://api.cerebras.ai/v1`).
    pub base_url: String,
    pub default_model: String,
    /// Default maximum tokens per response.
    pub max_tokens: u32,
    /// Whole-request timeout, connect included.
    pub timeout: Duration,
}

impl LlmClientConfig {
    /// Configuration for the Cerebras inference API.
    pub fn cerebras(api_key: impl Into<String>) -> Self {
        Self {
            provider: "cerebras".to_owned(),
            api_key: api_key.into(),
            base_url: CEREBRAS_BASE_URL.to_owned(),
            default_model: CEREBRAS_DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configuration for any OpenAI-compatible API.
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: "openai-compatible".to_owned(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A bearer-token client for the Chat Completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: Arc<LlmClientConfig>,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: config.provider.clone(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    /// Send a chat request and return the full response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<Completion> {
        let body = self.build_request_body(request);
        let resp = self.send_request(&body).await?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                provider = %self.config.provider,
                "upstream returned an error status"
            );
            return Err(AgentError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;

        parse_response(&v)
    }

    /// Build the JSON body for the Chat Completions API.
    fn build_request_body(&self, request: &ChatRequest) -> Value {
        let model = if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        };

        let mut body = json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": request.messages,
            "stream": false,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        body
    }

    async fn send_request(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("invalid authorization header: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(
            url = %url,
            model = %body["model"],
            provider = %self.config.provider,
            "sending LLM request"
        );

        self.http
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: if e.is_timeout() {
                    format!("request timed out after {:?}", self.config.timeout)
                } else {
                    e.to_string()
                },
            })
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        self.chat(request).await
    }
}

/// Parse a non-streaming Chat Completions response.
pub fn parse_response(v: &Value) -> Result<Completion> {
    let message = &v["choices"][0]["message"];

    if message.is_null() {
        return Err(AgentError::LlmParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    let text = message["content"].as_str().unwrap_or_default().to_owned();
    let usage = match &v["usage"] {
        Value::Null => json!({}),
        other => other.clone(),
    };

    Ok(Completion { text, usage })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
