//! Failures of a single classification call.
//!
//! Every variant is one failed batch attempt from the caller's point of
//! view; the pipeline retries the batch once and then writes it off. The
//! variants stay distinct so the retry log says why.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Non-success status that is not auth, model or throttling, or a
    /// 429 whose body says the account is out of quota.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// HTTP 401/403. The body is kept verbatim.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP 429 with the wait the endpoint asked for. The batch retry uses
    /// its own backoff and does not honor this value.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// HTTP 404, almost always a `classifier.model` the endpoint lacks.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API key variable named in the config is unset.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// 2xx, but the body is not a chat completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// `classifier.provider.timeout_secs` elapsed.
    #[error("timeout")]
    Timeout,

    #[error("http error: {0}")]
    Http(reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether a second attempt can plausibly succeed. Used for logging;
    /// the batch retry fires either way.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout | Self::Http(_) | Self::InvalidResponse(_)
        ) || matches!(self, Self::RequestFailed(msg) if msg.starts_with("HTTP 5"))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
