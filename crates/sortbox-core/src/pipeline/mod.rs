//! The classification pipeline.
//!
//! A run flows through these stages:
//!
//! 1. **Scan** -- census the user's threads and select candidates by mode
//! 2. **Batch** -- split candidates into fixed-size batches ([`batch`])
//! 3. **Execute** -- classify all batches concurrently with retry
//!    ([`executor`], [`retry`], [`classifier`], [`prompt`])
//! 4. **Apply** -- write accepted outcomes back and finalize the run record
//!    ([`orchestrator`], [`cost`])
//!
//! Step events flow to an optional [`ProgressSink`] ([`progress`]).

pub mod batch;
pub mod classifier;
pub mod cost;
pub mod executor;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod retry;

use std::time::Duration;

use sortbox_llm::ProviderError;

use crate::store::StoreError;

pub use batch::{BATCH_SIZE, create_batches};
pub use classifier::{BatchClassification, BatchClassifier, LlmBatchClassifier};
pub use cost::PricingTable;
pub use executor::{BatchRun, run_batches};
pub use orchestrator::{ClassificationPipeline, PipelineSettings, RunSummary};
pub use progress::{NdjsonSink, ProgressSink};
pub use retry::{RetryExhausted, RetryPolicy};

/// A single classification attempt failed.
///
/// These errors stay inside the per-batch retry boundary: a batch that
/// still fails on its last attempt is counted, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The provider call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model answered with no content.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The model's content did not match the response contract.
    #[error("malformed model response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A pipeline run could not complete.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The user has no buckets to classify into. No run record exists.
    #[error("no buckets configured for user {user_id}")]
    NoBuckets { user_id: String },

    /// A store call failed before a run record was created.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The run was aborted and marked failed.
    #[error("run {run_id} failed: {message}")]
    RunFailed { run_id: String, message: String },

    /// The run was aborted, and the store refused to mark it failed twice.
    /// The record may still read `running`.
    #[error("run {run_id} failed: {message}; run record could not be finalized: {cause}")]
    RunNotFinalized {
        run_id: String,
        message: String,
        cause: StoreError,
    },

    /// Batch execution exceeded the configured run timeout.
    #[error("batch execution timed out after {0:?}")]
    Timeout(Duration),
}
