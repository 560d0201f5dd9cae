//! Batch classification through an LLM provider.
//!
//! [`BatchClassifier`] is the seam the orchestrator calls once per batch
//! attempt. [`LlmBatchClassifier`] is the production implementation: it
//! renders the prompts, requests structured output from a
//! [`Provider`] and validates what comes back.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use sortbox_llm::{ChatMessage, ChatRequest, Provider};
use sortbox_types::{BucketDefinition, ClassificationCandidate, ClassificationOutcome};

use super::ClassifyError;
use super::prompt::{build_system_prompt, build_user_prompt, response_format};

/// Validated outcomes of one batch plus the tokens it consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchClassification {
    pub outcomes: Vec<ClassificationOutcome>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Classifies one batch of candidates against a bucket snapshot.
#[async_trait]
pub trait BatchClassifier: Send + Sync {
    /// Model identifier recorded on the run.
    fn model(&self) -> &str;

    /// Classify `batch`. One call is one attempt; retry lives in the caller.
    async fn classify(
        &self,
        batch: &[ClassificationCandidate],
        buckets: &[BucketDefinition],
    ) -> Result<BatchClassification, ClassifyError>;
}

/// Classifier backed by an OpenAI-compatible chat completion provider.
pub struct LlmBatchClassifier<P> {
    provider: P,
    model: String,
    temperature: f64,
    max_tokens: Option<i32>,
}

impl<P: Provider> LlmBatchClassifier<P> {
    /// Classifier for `model` at temperature 0.
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<i32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request_for(
        &self,
        batch: &[ClassificationCandidate],
        buckets: &[BucketDefinition],
    ) -> ChatRequest {
        ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(build_system_prompt(buckets)),
                ChatMessage::user(build_user_prompt(batch)),
            ],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens)
        .with_response_format(response_format())
    }
}

#[async_trait]
impl<P: Provider> BatchClassifier for LlmBatchClassifier<P> {
    fn model(&self) -> &str {
        &self.model
    }

    async fn classify(
        &self,
        batch: &[ClassificationCandidate],
        buckets: &[BucketDefinition],
    ) -> Result<BatchClassification, ClassifyError> {
        let request = self.request_for(batch, buckets);
        let response = self.provider.complete(&request).await.inspect_err(|e| {
            debug!(
                provider = %self.provider.name(),
                batch_size = batch.len(),
                transient = e.is_transient(),
                error = %e,
                "provider call failed"
            );
        })?;

        let content = response.first_content().ok_or(ClassifyError::EmptyResponse)?;
        let outcomes = parse_outcomes(content)?;
        let returned = outcomes.len();
        let outcomes = validate_outcomes(batch, buckets, outcomes);

        let usage = response.usage.unwrap_or_default();
        debug!(
            provider = %self.provider.name(),
            batch_size = batch.len(),
            returned,
            accepted = outcomes.len(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "batch classified"
        );

        Ok(BatchClassification {
            outcomes,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }
}

/// The two answer shapes models produce: the schema's wrapper object, or
/// the bare array the system prompt describes.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModelAnswer {
    Wrapped {
        classifications: Vec<ClassificationOutcome>,
    },
    Bare(Vec<ClassificationOutcome>),
}

/// Parse the model's answer, tolerating a surrounding markdown fence.
pub fn parse_outcomes(content: &str) -> Result<Vec<ClassificationOutcome>, ClassifyError> {
    let answer: ModelAnswer = serde_json::from_str(strip_markdown_fences(content))?;
    Ok(match answer {
        ModelAnswer::Wrapped { classifications } => classifications,
        ModelAnswer::Bare(outcomes) => outcomes,
    })
}

fn strip_markdown_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Keep outcomes that name a thread of `batch` and a bucket of `buckets`.
///
/// Only the first outcome per thread survives, and confidence is clamped
/// into `[0, 1]` (NaN reads as 0).
pub fn validate_outcomes(
    batch: &[ClassificationCandidate],
    buckets: &[BucketDefinition],
    outcomes: Vec<ClassificationOutcome>,
) -> Vec<ClassificationOutcome> {
    let thread_ids: HashSet<&str> = batch.iter().map(|c| c.thread_id.as_str()).collect();
    let bucket_names: HashSet<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
    let mut seen = HashSet::new();

    outcomes
        .into_iter()
        .filter_map(|mut outcome| {
            if !thread_ids.contains(outcome.thread_id.as_str()) {
                debug!(thread_id = %outcome.thread_id, "dropping outcome for thread outside batch");
                return None;
            }
            if !bucket_names.contains(outcome.bucket.as_str()) {
                debug!(
                    thread_id = %outcome.thread_id,
                    bucket = %outcome.bucket,
                    "dropping outcome with unknown bucket"
                );
                return None;
            }
            if !seen.insert(outcome.thread_id.clone()) {
                debug!(thread_id = %outcome.thread_id, "dropping duplicate outcome");
                return None;
            }
            outcome.confidence = clamp_confidence(outcome.confidence);
            Some(outcome)
        })
        .collect()
}

pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
