//! HTTP client for `POST {base_url}/chat/completions`.
//!
//! One request per batch attempt, no streaming. Failures are mapped to a
//! [`ProviderError`] by [`error_for_status`] so the batch retry log can say
//! whether the endpoint throttled, rejected the key or lost the model.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::LlmProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

/// Wait reported for a 429 that names none.
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// Chat completion client for an OpenAI-compatible endpoint.
///
/// The key is read from `config.api_key_env` on every call unless one was
/// given to [`with_api_key`](Self::with_api_key), so rotating the variable
/// needs no restart.
pub struct OpenAiCompatProvider {
    config: LlmProviderConfig,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(config: LlmProviderConfig) -> Self {
        let http = build_client(&config);
        Self {
            config,
            http,
            api_key: None,
        }
    }

    pub fn with_api_key(config: LlmProviderConfig, api_key: String) -> Self {
        Self {
            api_key: Some(api_key),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &LlmProviderConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.config.api_key_env).map_err(|_| {
            ProviderError::NotConfigured(format!("set {} env var", self.config.api_key_env))
        })
    }
}

fn build_client(config: &LlmProviderConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let api_key = self.resolve_api_key()?;

        debug!(
            provider = %self.config.name,
            model = %request.model,
            structured = request.response_format.is_some(),
            "requesting classification"
        );

        let mut req = self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .header("Content-Type", "application/json");
        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req.json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let header_ms = retry_after_header_ms(&response);
            let body = response.text().await.unwrap_or_default();
            let err = error_for_status(status, &body, &request.model, header_ms);
            warn!(provider = %self.config.name, %status, error = %err, "classification request rejected");
            return Err(err);
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        debug!(
            provider = %self.config.name,
            model = %chat_response.model,
            choices = chat_response.choices.len(),
            prompt_tokens = chat_response.usage.map(|u| u.prompt_tokens).unwrap_or(0),
            "classification response received"
        );

        Ok(chat_response)
    }
}

/// Map a non-success response to the error the batch attempt reports.
///
/// A 429 is a rate limit unless its body says the quota or spending limit
/// is gone, which no amount of waiting fixes.
pub fn error_for_status(
    status: StatusCode,
    body: &str,
    model: &str,
    header_retry_ms: Option<u64>,
) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS if is_quota_exhausted(body) => ProviderError::RequestFailed(
            error_message(body).unwrap_or_else(|| "quota exhausted or spending limit reached".into()),
        ),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after_ms: header_retry_ms
                .or_else(|| body_retry_ms(body))
                .unwrap_or(DEFAULT_RETRY_AFTER_MS),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthFailed(body.into()),
        StatusCode::NOT_FOUND => ProviderError::ModelNotFound(format!("model '{model}': {body}")),
        _ => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}

fn is_quota_exhausted(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["insufficient_quota", "quota exceeded", "exceeded your current quota", "spending limit", "billing"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// `error.message`, or `error` when it is a bare string.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(String::from)
}

fn retry_after_header_ms(response: &reqwest::Response) -> Option<u64> {
    let secs: f64 = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    Some((secs * 1000.0).max(0.0) as u64)
}

fn body_retry_ms(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("retry_after_ms").and_then(|v| v.as_u64()).or_else(|| {
        value
            .get("retry_after")
            .and_then(|v| v.as_f64())
            .map(|secs| (secs * 1000.0).max(0.0) as u64)
    })
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
