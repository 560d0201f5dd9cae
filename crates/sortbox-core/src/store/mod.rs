//! Persistence seams used by the pipeline.
//!
//! The pipeline only talks to these traits; the store is injected as an
//! `Arc<S>`. [`InMemoryStore`] implements all three for tests and the CLI.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sortbox_types::{Bucket, ClassificationRun, EmailThread, NewRun, RunUpdate};

/// Errors returned by store implementations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist (or is not the caller's).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The run is `completed` or `failed` and can no longer change.
    #[error("run {0} is already finalized")]
    RunFinalized(String),

    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User-owned bucket definitions.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// The user's buckets ordered by `sort_order`.
    async fn list_buckets(&self, user_id: &str) -> StoreResult<Vec<Bucket>>;

    /// Add a bucket at the end of the user's ordering. Names are unique per
    /// user.
    async fn create_bucket(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        is_default: bool,
    ) -> StoreResult<Bucket>;

    async fn count_buckets(&self, user_id: &str) -> StoreResult<usize>;

    /// Rename or re-describe one of the user's buckets. `None` or an empty
    /// string leaves the field unchanged. A rename must stay unique.
    /// Runs already under way keep classifying against their snapshot.
    async fn update_bucket(
        &self,
        user_id: &str,
        bucket_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Bucket>;

    /// Remove one of the user's buckets. Its threads become unclassified,
    /// manual placements included, so the next run picks them up again.
    async fn delete_bucket(&self, user_id: &str, bucket_id: &str) -> StoreResult<()>;
}

/// Synced threads and their classification state.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// The user's threads, newest first.
    async fn list_threads(&self, user_id: &str) -> StoreResult<Vec<EmailThread>>;

    /// Record a pipeline verdict. Returns `false` without writing when the
    /// thread or the bucket is gone, or the thread has been manually
    /// overridden meanwhile.
    async fn update_thread_classification(
        &self,
        thread_id: &str,
        bucket_id: &str,
        confidence: f64,
        classified_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Insert or refresh synced threads. Existing classification state is
    /// kept; only the message metadata is replaced.
    async fn upsert_threads(&self, user_id: &str, threads: Vec<EmailThread>) -> StoreResult<usize>;

    /// Move a thread by hand. The pipeline never reclassifies it afterwards.
    async fn override_thread_bucket(
        &self,
        user_id: &str,
        thread_id: &str,
        bucket_id: &str,
    ) -> StoreResult<()>;
}

/// Audit records of classification runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create a `running` record and return its id.
    async fn create_run(&self, run: NewRun) -> StoreResult<String>;

    /// Apply `update`. Fails with [`StoreError::RunFinalized`] once the run
    /// is terminal.
    async fn update_run(&self, run_id: &str, update: RunUpdate) -> StoreResult<()>;

    async fn get_run(&self, run_id: &str) -> StoreResult<Option<ClassificationRun>>;

    /// Most recent runs first, at most `limit`.
    async fn list_runs(&self, user_id: &str, limit: usize) -> StoreResult<Vec<ClassificationRun>>;
}
