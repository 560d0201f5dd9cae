//! Mock HTTP server tests for `OpenAiCompatProvider::complete()`.
//!
//! Uses [`wiremock`] to stand up a local HTTP server that emulates
//! OpenAI-compatible chat completion responses, exercising the full
//! request/response path without hitting a real API.

use std::collections::HashMap;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sortbox_llm::config::LlmProviderConfig;
use sortbox_llm::error::ProviderError;
use sortbox_llm::openai_compat::OpenAiCompatProvider;
use sortbox_llm::provider::Provider;
use sortbox_llm::types::{ChatMessage, ChatRequest};

fn mock_config(server_url: &str) -> LlmProviderConfig {
    LlmProviderConfig {
        name: "mock-provider".into(),
        base_url: server_url.into(),
        api_key_env: "SORTBOX_MOCK_UNUSED_KEY".into(),
        headers: HashMap::new(),
        timeout_secs: Some(5),
    }
}

fn test_request() -> ChatRequest {
    ChatRequest::new(
        "gpt-4o-mini",
        vec![
            ChatMessage::system("You are an expert email classifier."),
            ChatMessage::user("Thread ID: t-1\n---"),
        ],
    )
}

fn provider(server: &MockServer) -> OpenAiCompatProvider {
    OpenAiCompatProvider::with_api_key(mock_config(&server.uri()), "sk-mock-key".into())
}

#[tokio::test]
async fn complete_success_structured_response() {
    let server = MockServer::start().await;

    let content = r#"{"classifications":[{"threadId":"t-1","bucket":"FYI","confidence":0.82}]}"#;
    let body = serde_json::json!({
        "id": "chatcmpl-test-001",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 310, "completion_tokens": 24, "total_tokens": 334}
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-mock-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server).complete(&test_request()).await.unwrap();

    assert_eq!(response.id, "chatcmpl-test-001");
    assert_eq!(response.first_content(), Some(content));
    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 310);
    assert_eq!(usage.completion_tokens, 24);
}

#[tokio::test]
async fn complete_sends_response_format() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "c", "model": "gpt-4o-mini",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "{}"}, "finish_reason": "stop"}]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "temperature": 0.0,
            "response_format": {"type": "json_schema"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let request = test_request()
        .with_temperature(0.0)
        .with_response_format(serde_json::json!({"type": "json_schema"}));
    provider(&server).complete(&request).await.unwrap();
}

#[tokio::test]
async fn complete_401_returns_auth_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&test_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::AuthFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn complete_429_returns_rate_limited_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(serde_json::json!({"retry_after_ms": 1500})),
        )
        .mount(&server)
        .await;

    let err = provider(&server).complete(&test_request()).await.unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 1500),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_429_quota_is_request_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "You exceeded your current quota", "code": "insufficient_quota"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&test_request()).await.unwrap_err();
    match err {
        ProviderError::RequestFailed(msg) => assert!(msg.contains("quota")),
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_404_returns_model_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such model"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&test_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ModelNotFound(ref m) if m.contains("gpt-4o-mini")));
}

#[tokio::test]
async fn complete_500_returns_request_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&test_request()).await.unwrap_err();
    match err {
        ProviderError::RequestFailed(msg) => assert!(msg.starts_with("HTTP 500")),
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_malformed_json_returns_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&test_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn complete_forwards_custom_headers() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "c", "model": "m",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("X-Org", "sortbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = mock_config(&server.uri());
    config.headers.insert("X-Org".into(), "sortbox".into());
    let provider = OpenAiCompatProvider::with_api_key(config, "sk-mock-key".into());
    provider.complete(&test_request()).await.unwrap();
}

#[tokio::test]
async fn complete_missing_api_key_returns_not_configured() {
    let server = MockServer::start().await;
    let provider = OpenAiCompatProvider::new(mock_config(&server.uri()));

    let err = provider.complete(&test_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}
