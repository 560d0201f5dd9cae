//! Domain model: buckets, threads, classification outcomes and run records.
//!
//! Wire-facing types serialize with camelCase keys so the bucket snapshot
//! stored on a run and the outcomes returned by the model share one shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Buckets ─────────────────────────────────────────────────────────────

/// A bucket as the classifier sees it: a label and the text that guides it.
///
/// `name` is unique within a user and is the value the model answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDefinition {
    /// Bucket label, used verbatim as the classification answer.
    pub name: String,

    /// Natural-language description fed into the system prompt.
    pub description: String,
}

impl BucketDefinition {
    /// Create a bucket definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A durable, user-owned bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Durable identifier.
    pub id: String,

    /// Owning user.
    pub user_id: String,

    /// Bucket label (unique per user).
    pub name: String,

    /// Description used in the classification prompt.
    pub description: String,

    /// Display and prompt ordering (ascending).
    #[serde(default)]
    pub sort_order: i32,

    /// Whether the bucket came from the default seed set.
    #[serde(default)]
    pub is_default: bool,
}

impl Bucket {
    /// The classifier-facing view of this bucket.
    pub fn definition(&self) -> BucketDefinition {
        BucketDefinition::new(&self.name, &self.description)
    }
}

// ── Threads ─────────────────────────────────────────────────────────────

/// A synced email thread together with its classification state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailThread {
    /// Durable identifier.
    pub id: String,

    /// Owning user.
    #[serde(default)]
    pub user_id: String,

    /// Display form of the sender (e.g. `Alice <alice@example.com>`).
    pub sender: String,

    /// Subject line.
    pub subject: String,

    /// Provider-supplied preview text.
    #[serde(default)]
    pub snippet: String,

    /// Timestamp of the latest message.
    pub date: DateTime<Utc>,

    /// Assigned bucket, if classified or overridden.
    #[serde(default)]
    pub bucket_id: Option<String>,

    /// Model confidence for the current assignment.
    #[serde(default)]
    pub confidence: Option<f64>,

    /// When the pipeline last wrote the assignment.
    #[serde(default)]
    pub classified_at: Option<DateTime<Utc>>,

    /// Set when a human moved the thread. The pipeline never touches it again.
    #[serde(default)]
    pub user_override: bool,
}

impl EmailThread {
    /// Whether the thread has any bucket assignment.
    pub fn is_classified(&self) -> bool {
        self.bucket_id.is_some()
    }

    /// The classifier input for this thread.
    pub fn to_candidate(&self) -> ClassificationCandidate {
        ClassificationCandidate {
            thread_id: self.id.clone(),
            sender: self.sender.clone(),
            subject: self.subject.clone(),
            snippet: self.snippet.clone(),
            date: self.date.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// One email thread as seen by the classifier. Read-only input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationCandidate {
    /// Thread identifier echoed back by the model.
    pub thread_id: String,

    /// Sender display string.
    pub sender: String,

    /// Subject line.
    pub subject: String,

    /// Preview text.
    pub snippet: String,

    /// RFC 3339 timestamp.
    pub date: String,
}

/// The model's verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    /// Candidate the verdict applies to.
    pub thread_id: String,

    /// Bucket name (not id).
    pub bucket: String,

    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Which threads a run picks up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Only threads with no bucket and no manual override.
    #[default]
    Incremental,

    /// Every thread without a manual override, classified or not.
    FullReclassify,
}

impl ClassificationMode {
    /// Whether `thread` is a candidate under this mode.
    pub fn selects(self, thread: &EmailThread) -> bool {
        if thread.user_override {
            return false;
        }
        match self {
            Self::Incremental => !thread.is_classified(),
            Self::FullReclassify => true,
        }
    }
}

// ── Runs ────────────────────────────────────────────────────────────────

/// Lifecycle state of a classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created; batches executing.
    Running,
    /// Finished, possibly with a partial-failure note.
    Completed,
    /// Aborted by an error outside the per-batch retry boundary.
    Failed,
}

impl RunStatus {
    /// `Completed` and `Failed` are terminal; a run in either is immutable.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Lowercase name as stored.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The audit record of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRun {
    pub id: String,
    pub user_id: String,
    pub status: RunStatus,
    pub total_threads: usize,
    pub classified_count: usize,
    /// Buckets the run classified against, frozen at start.
    pub bucket_snapshot: Vec<BucketDefinition>,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_cents: f64,
    /// Partial-failure note on `Completed`, or the failure cause on `Failed`.
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields supplied when a run record is created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub user_id: String,
    pub total_threads: usize,
    pub bucket_snapshot: Vec<BucketDefinition>,
    pub model: String,
}

/// A partial update to a run record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUpdate {
    pub status: Option<RunStatus>,
    pub classified_count: Option<usize>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost_cents: Option<f64>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunUpdate {
    /// The terminal update for a run that finished its batches.
    pub fn completed(
        classified_count: usize,
        input_tokens: u64,
        output_tokens: u64,
        cost_cents: f64,
        note: Option<String>,
    ) -> Self {
        Self {
            status: Some(RunStatus::Completed),
            classified_count: Some(classified_count),
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            cost_cents: Some(cost_cents),
            error_message: note,
            completed_at: Some(Utc::now()),
        }
    }

    /// The terminal update for a run aborted by `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(RunStatus::Failed),
            error_message: Some(message.into()),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Apply the present fields onto `run`.
    pub fn apply_to(self, run: &mut ClassificationRun) {
        if let Some(status) = self.status {
            run.status = status;
        }
        if let Some(count) = self.classified_count {
            run.classified_count = count;
        }
        if let Some(tokens) = self.input_tokens {
            run.input_tokens = tokens;
        }
        if let Some(tokens) = self.output_tokens {
            run.output_tokens = tokens;
        }
        if let Some(cost) = self.cost_cents {
            run.cost_cents = cost;
        }
        if self.error_message.is_some() {
            run.error_message = self.error_message;
        }
        if self.completed_at.is_some() {
            run.completed_at = self.completed_at;
        }
    }
}
