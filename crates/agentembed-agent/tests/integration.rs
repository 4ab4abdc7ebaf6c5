//! Integration tests for the agentembed-agent crate.
//!
//! The upstream Chat Completions API is stood in for by a `wiremock`
//! server, so these tests exercise the real HTTP path (headers, body,
//! status handling, timeouts) without network access.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agentembed_agent::{
    AgentError, ChatRequest, CompletionBackend, LlmClient, LlmClientConfig, Message,
};

fn client_for(server: &MockServer) -> LlmClient {
    LlmClient::new(LlmClientConfig::openai_compatible(
        "test-key",
        "llama3.1-8b",
        server.uri(),
    ))
    .unwrap()
}

fn turn() -> ChatRequest {
    ChatRequest::chat_turn(vec![
        Message::system("You are Helper, with a warm and casual personality."),
        Message::user("Hi"),
    ])
}

#[tokio::test]
async fn successful_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "llama3.1-8b",
            "max_tokens": 2000,
            "stream": false,
            "messages": [
                {"role": "system", "content": "You are Helper, with a warm and casual personality."},
                {"role": "user", "content": "Hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello! How can I help?"}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 6, "total_tokens": 26}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = client_for(&server).complete(&turn()).await.unwrap();
    assert_eq!(completion.text, "Hello! How can I help?");
    assert_eq!(completion.usage["completion_tokens"], 6);
}

#[tokio::test]
async fn non_2xx_is_upstream_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = client_for(&server).chat(&turn()).await.unwrap_err();
    match err {
        AgentError::UpstreamStatus { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected UpstreamStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).chat(&turn()).await.unwrap_err();
    assert!(matches!(err, AgentError::LlmParseFailed { .. }));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = LlmClientConfig::openai_compatible("test-key", "m", server.uri())
        .with_timeout(Duration::from_millis(50));
    let err = LlmClient::new(config).unwrap().chat(&turn()).await.unwrap_err();
    match err {
        AgentError::LlmRequestFailed { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected LlmRequestFailed, got {other:?}"),
    }
}
