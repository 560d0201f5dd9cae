//! Step events streamed while a classification run executes.
//!
//! Each event serializes as one JSON object tagged by `step`:
//!
//! ```text
//! {"step":"scanning","total":42,"manual":3,"alreadyClassified":30,"toClassify":9}
//! {"step":"classifying","runId":"...","threadCount":9,"batchCount":1}
//! {"step":"progress","classified":1,"total":1}
//! {"step":"complete","runId":"...","classifiedCount":9,"costCents":0.01,"message":"..."}
//! ```
//!
//! Consumers showing a live log may keep only the latest `progress` line;
//! the pipeline itself emits every event.

use serde::{Deserialize, Serialize};

/// One pipeline step, as seen by the invoking caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ProgressEvent {
    /// Thread census taken before any work starts.
    #[serde(rename_all = "camelCase")]
    Scanning {
        total: usize,
        manual: usize,
        already_classified: usize,
        to_classify: usize,
    },

    /// A run record exists and batches are about to be dispatched.
    #[serde(rename_all = "camelCase")]
    Classifying {
        run_id: String,
        thread_count: usize,
        batch_count: usize,
    },

    /// One more batch settled. `classified` counts settled batches.
    Progress { classified: usize, total: usize },

    /// The run finished (possibly with failed batches) or had nothing to do.
    #[serde(rename_all = "camelCase")]
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
        classified_count: usize,
        cost_cents: f64,
        message: String,
    },

    /// The run could not complete.
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
        message: String,
    },
}

impl ProgressEvent {
    /// The `step` tag of this event.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Scanning { .. } => "scanning",
            Self::Classifying { .. } => "classifying",
            Self::Progress { .. } => "progress",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Human-readable one-liner for log views.
    pub fn summary(&self) -> String {
        match self {
            Self::Scanning {
                total,
                manual,
                already_classified,
                to_classify,
            } => {
                let mut parts = vec![format!("Found {total} emails.")];
                if *manual > 0 {
                    parts.push(format!("{manual} manually sorted by you."));
                }
                if *already_classified > 0 {
                    parts.push(format!("{already_classified} already classified."));
                }
                if *to_classify > 0 {
                    parts.push(format!("{to_classify} remaining."));
                } else {
                    parts.push("Everything is already classified!".into());
                }
                parts.join(" ")
            }
            Self::Classifying { thread_count, .. } => {
                format!("Classifying {thread_count} emails...")
            }
            Self::Progress { classified, total } => {
                format!("Classifying... {classified}/{total}")
            }
            Self::Complete {
                classified_count,
                cost_cents,
                message,
                ..
            } => {
                if *classified_count == 0 {
                    message.clone()
                } else {
                    format!(
                        "Done! {classified_count} emails classified. (${:.4})",
                        cost_cents / 100.0
                    )
                }
            }
            Self::Error { message, .. } => format!("Error: {message}"),
        }
    }
}
