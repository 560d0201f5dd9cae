//! Configuration schema types.
//!
//! All structs accept both `snake_case` and `camelCase` field names in JSON
//! via `#[serde(alias)]`, and every field has a default so an empty object
//! (or no config file at all) yields a working configuration. Unknown
//! fields are silently ignored for forward compatibility.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SortboxError};

/// Model used when the config does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration for sortbox.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Classification model and provider endpoint.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Batch execution tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Per-model token prices used to cost each run.
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl Config {
    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_attempts == 0 {
            return Err(SortboxError::ConfigInvalid {
                reason: "pipeline.max_attempts must be at least 1".into(),
            });
        }
        if self.classifier.model.trim().is_empty() {
            return Err(SortboxError::ConfigInvalid {
                reason: "classifier.model must not be empty".into(),
            });
        }
        for (model, price) in &self.pricing.models {
            if price.input_per_million < 0.0 || price.output_per_million < 0.0 {
                return Err(SortboxError::ConfigInvalid {
                    reason: format!("pricing for '{model}' must not be negative"),
                });
            }
        }
        Ok(())
    }
}

// ── Classifier ───────────────────────────────────────────────────────────

/// Which model classifies and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Model identifier sent to the provider and recorded on each run.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature. Classification wants determinism.
    #[serde(default)]
    pub temperature: f64,

    /// Optional cap on completion tokens per batch.
    #[serde(default, alias = "maxTokens")]
    pub max_tokens: Option<i32>,

    /// Provider endpoint.
    #[serde(default)]
    pub provider: ProviderSettings,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_tokens: None,
            provider: ProviderSettings::default(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider name used in logs.
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL, e.g. `https://api.openai.com/v1`.
    #[serde(default = "default_base_url", alias = "baseUrl")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env", alias = "apiKeyEnv")]
    pub api_key_env: String,

    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request timeout in seconds.
    #[serde(default, alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            headers: HashMap::new(),
            timeout_secs: None,
        }
    }
}

fn default_provider_name() -> String {
    "openai".into()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// Retry and timeout settings for batch execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Backoff unit; batch `i` waits `retry_base_delay_ms * (i + 1)` before
    /// its retry.
    #[serde(default = "default_retry_base_delay_ms", alias = "retryBaseDelayMs")]
    pub retry_base_delay_ms: u64,

    /// Total attempts per batch, original call included.
    #[serde(default = "default_max_attempts", alias = "maxAttempts")]
    pub max_attempts: u32,

    /// Optional ceiling on the whole batch-execution step.
    #[serde(default, alias = "runTimeoutSecs")]
    pub run_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_attempts: default_max_attempts(),
            run_timeout_secs: None,
        }
    }
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    2
}

// ── Pricing ──────────────────────────────────────────────────────────────

/// USD price per one million tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// USD per 1M prompt tokens.
    #[serde(alias = "inputPerMillion")]
    pub input_per_million: f64,

    /// USD per 1M completion tokens.
    #[serde(alias = "outputPerMillion")]
    pub output_per_million: f64,
}

/// Price table keyed by model identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Known model prices. Entries here extend the built-in table.
    #[serde(default = "builtin_prices")]
    pub models: HashMap<String, ModelPrice>,

    /// Price applied to models missing from `models`.
    #[serde(default)]
    pub fallback: Option<ModelPrice>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            models: builtin_prices(),
            fallback: None,
        }
    }
}

/// Prices shipped with sortbox.
pub fn builtin_prices() -> HashMap<String, ModelPrice> {
    HashMap::from([
        (
            "gpt-4o-mini".into(),
            ModelPrice {
                input_per_million: 0.15,
                output_per_million: 0.60,
            },
        ),
        (
            "gpt-4o".into(),
            ModelPrice {
                input_per_million: 2.50,
                output_per_million: 10.00,
            },
        ),
        (
            "gpt-4.1-mini".into(),
            ModelPrice {
                input_per_million: 0.40,
                output_per_million: 1.60,
            },
        ),
    ])
}
