//! Run orchestration: scan, record, execute, apply, finalize.
//!
//! [`ClassificationPipeline::run`] drives one classification run for one
//! user. Once a run record exists, every error funnels through a single
//! handler that marks the run `failed`. If the store refuses that update
//! twice the caller gets [`PipelineError::RunNotFinalized`], never a plain
//! `RunFailed` for a record that still reads `running`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use sortbox_types::config::Config;
use sortbox_types::{
    Bucket, BucketDefinition, ClassificationCandidate, ClassificationMode, ClassificationOutcome,
    EmailThread, NewRun, ProgressEvent, RunUpdate,
};

use super::{ClassifyError, PipelineError};
use super::batch::{batch_count, create_batches};
use super::classifier::{BatchClassifier, clamp_confidence, validate_outcomes};
use super::cost::{PricingTable, round_cents};
use super::executor::run_batches;
use super::progress::{ProgressSink, publish};
use super::retry::RetryPolicy;
use crate::store::{BucketStore, RunStore, StoreError, ThreadStore};

/// Message of the `complete` event when no thread needs classifying.
pub const NOTHING_TO_DO: &str = "nothing to do";

const FINALIZE_ATTEMPTS: u32 = 2;

/// Tuning knobs for a pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    /// Per-batch retry.
    pub retry: RetryPolicy,
    /// Prices used to cost each run.
    pub pricing: PricingTable,
    /// Ceiling on batch execution. `None` waits for every batch.
    pub run_timeout: Option<Duration>,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            retry: RetryPolicy::new(
                config.pipeline.max_attempts,
                config.pipeline.retry_base_delay_ms,
            ),
            pricing: PricingTable::from(&config.pricing),
            run_timeout: config.pipeline.run_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// `None` when there was nothing to classify and no run was recorded.
    pub run_id: Option<String>,
    pub total_threads: usize,
    pub classified_count: usize,
    pub failed_batches: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_cents: f64,
}

impl RunSummary {
    fn nothing_to_do() -> Self {
        Self {
            run_id: None,
            total_threads: 0,
            classified_count: 0,
            failed_batches: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost_cents: 0.0,
        }
    }

    /// The partial-failure note stored on the run, if any batch failed.
    pub fn failure_note(&self) -> Option<String> {
        (self.failed_batches > 0)
            .then(|| format!("{} batch(es) failed after retry", self.failed_batches))
    }
}

/// Thread census taken before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Census {
    total: usize,
    manual: usize,
    already_classified: usize,
}

impl Census {
    fn of(threads: &[EmailThread]) -> Self {
        Self {
            total: threads.len(),
            manual: threads.iter().filter(|t| t.user_override).count(),
            already_classified: threads
                .iter()
                .filter(|t| !t.user_override && t.is_classified())
                .count(),
        }
    }
}

/// Classifies a user's threads into their buckets.
pub struct ClassificationPipeline<S, C: ?Sized> {
    store: Arc<S>,
    classifier: Arc<C>,
    settings: PipelineSettings,
}

impl<S, C> ClassificationPipeline<S, C>
where
    S: BucketStore + ThreadStore + RunStore,
    C: BatchClassifier + ?Sized,
{
    pub fn new(store: Arc<S>, classifier: Arc<C>, settings: PipelineSettings) -> Self {
        Self {
            store,
            classifier,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one classification pass for `user_id`.
    ///
    /// Emits `scanning`, then either `complete` straight away (nothing to
    /// do) or `classifying`, one `progress` per batch and a final
    /// `complete`. Failures emit `error` instead of `complete`.
    pub async fn run(
        &self,
        user_id: &str,
        mode: ClassificationMode,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<RunSummary, PipelineError> {
        info!(user_id, ?mode, model = self.classifier.model(), "starting classification run");

        let (buckets, threads) = match self.load(user_id).await {
            Ok(loaded) => loaded,
            Err(err) => {
                publish(
                    sink,
                    ProgressEvent::Error {
                        run_id: None,
                        message: err.to_string(),
                    },
                );
                return Err(err);
            }
        };

        let census = Census::of(&threads);
        let candidates: Vec<ClassificationCandidate> = threads
            .iter()
            .filter(|t| mode.selects(t))
            .map(EmailThread::to_candidate)
            .collect();

        publish(
            sink,
            ProgressEvent::Scanning {
                total: census.total,
                manual: census.manual,
                already_classified: census.already_classified,
                to_classify: candidates.len(),
            },
        );

        if candidates.is_empty() {
            publish(
                sink,
                ProgressEvent::Complete {
                    run_id: None,
                    classified_count: 0,
                    cost_cents: 0.0,
                    message: NOTHING_TO_DO.into(),
                },
            );
            return Ok(RunSummary::nothing_to_do());
        }

        let snapshot: Vec<BucketDefinition> = buckets.iter().map(Bucket::definition).collect();
        let run_id = match self
            .store
            .create_run(NewRun {
                user_id: user_id.into(),
                total_threads: candidates.len(),
                bucket_snapshot: snapshot.clone(),
                model: self.classifier.model().into(),
            })
            .await
        {
            Ok(id) => id,
            Err(err) => {
                let err = PipelineError::from(err);
                publish(
                    sink,
                    ProgressEvent::Error {
                        run_id: None,
                        message: err.to_string(),
                    },
                );
                return Err(err);
            }
        };

        publish(
            sink,
            ProgressEvent::Classifying {
                run_id: run_id.clone(),
                thread_count: candidates.len(),
                batch_count: batch_count(candidates.len()),
            },
        );

        match self
            .execute(&run_id, &buckets, &snapshot, &candidates, sink)
            .await
        {
            Ok(summary) => Ok(summary),
            Err(err) => Err(self.fail_run(run_id, err, sink).await),
        }
    }

    async fn load(&self, user_id: &str) -> Result<(Vec<Bucket>, Vec<EmailThread>), PipelineError> {
        let buckets = self.store.list_buckets(user_id).await?;
        if buckets.is_empty() {
            return Err(PipelineError::NoBuckets {
                user_id: user_id.into(),
            });
        }
        let threads = self.store.list_threads(user_id).await?;
        Ok((buckets, threads))
    }

    /// Steps after the run record exists. Any error here fails the run.
    async fn execute(
        &self,
        run_id: &str,
        buckets: &[Bucket],
        snapshot: &[BucketDefinition],
        candidates: &[ClassificationCandidate],
        sink: Option<&dyn ProgressSink>,
    ) -> Result<RunSummary, PipelineError> {
        let batches = create_batches(candidates);
        let input_tokens = AtomicU64::new(0);
        let output_tokens = AtomicU64::new(0);

        let classifier = &*self.classifier;
        let (input_ref, output_ref) = (&input_tokens, &output_tokens);
        let report = |completed: usize, total: usize| {
            publish(
                sink,
                ProgressEvent::Progress {
                    classified: completed,
                    total,
                },
            );
        };

        let execution = run_batches(
            &batches,
            |_index, batch| async move {
                let result = classifier.classify(batch, snapshot).await?;
                input_ref.fetch_add(result.input_tokens, Ordering::Relaxed);
                output_ref.fetch_add(result.output_tokens, Ordering::Relaxed);
                // A batch may only answer for its own threads, whatever the
                // classifier checked.
                Ok::<_, ClassifyError>(validate_outcomes(batch, snapshot, result.outcomes))
            },
            &self.settings.retry,
            Some(&report),
        );
        let mut batch_run = match self.settings.run_timeout {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .map_err(|_| PipelineError::Timeout(limit))?,
            None => execution.await,
        };

        let classified_count = self
            .apply_outcomes(run_id, buckets, std::mem::take(&mut batch_run.outcomes))
            .await?;

        let input_tokens = input_tokens.load(Ordering::Relaxed);
        let output_tokens = output_tokens.load(Ordering::Relaxed);
        let cost_cents =
            self.settings
                .pricing
                .cost_cents(self.classifier.model(), input_tokens, output_tokens);

        let summary = RunSummary {
            run_id: Some(run_id.into()),
            total_threads: candidates.len(),
            classified_count,
            failed_batches: batch_run.failures,
            input_tokens,
            output_tokens,
            cost_cents,
        };
        let note = summary.failure_note();

        self.store
            .update_run(
                run_id,
                RunUpdate::completed(
                    classified_count,
                    input_tokens,
                    output_tokens,
                    cost_cents,
                    note.clone(),
                ),
            )
            .await?;

        info!(
            run_id,
            classified = classified_count,
            total = candidates.len(),
            failed_batches = batch_run.failures,
            input_tokens,
            output_tokens,
            cost_cents,
            "classification run completed"
        );

        let message = if batch_run.all_failed() {
            format!(
                "No threads classified: all {} batch(es) failed after retry.",
                batch_run.total_batches
            )
        } else {
            let mut message = format!(
                "Classified {classified_count} of {} threads.",
                candidates.len()
            );
            if let Some(note) = note {
                message.push(' ');
                message.push_str(&note);
            }
            message
        };
        publish(
            sink,
            ProgressEvent::Complete {
                run_id: Some(run_id.into()),
                classified_count,
                cost_cents: round_cents(cost_cents),
                message,
            },
        );

        Ok(summary)
    }

    /// Write accepted outcomes back. Returns how many threads changed.
    async fn apply_outcomes(
        &self,
        run_id: &str,
        buckets: &[Bucket],
        outcomes: Vec<ClassificationOutcome>,
    ) -> Result<usize, PipelineError> {
        let bucket_ids: HashMap<&str, &str> = buckets
            .iter()
            .map(|b| (b.name.as_str(), b.id.as_str()))
            .collect();
        let mut applied = HashSet::new();
        let classified_at = Utc::now();

        for outcome in outcomes {
            let Some(bucket_id) = bucket_ids.get(outcome.bucket.as_str()) else {
                debug!(run_id, thread_id = %outcome.thread_id, bucket = %outcome.bucket, "skipping outcome with unknown bucket");
                continue;
            };
            if applied.contains(&outcome.thread_id) {
                continue;
            }
            let written = self
                .store
                .update_thread_classification(
                    &outcome.thread_id,
                    bucket_id,
                    clamp_confidence(outcome.confidence),
                    classified_at,
                )
                .await?;
            if written {
                applied.insert(outcome.thread_id);
            }
        }

        Ok(applied.len())
    }

    /// Mark the run failed and tell the caller. The terminal update is
    /// tried twice; a run that is already terminal counts as marked.
    async fn fail_run(
        &self,
        run_id: String,
        err: PipelineError,
        sink: Option<&dyn ProgressSink>,
    ) -> PipelineError {
        let message = err.to_string();
        error!(run_id = %run_id, error = %message, "classification run failed");

        let mut unrecorded = None;
        for attempt in 1..=FINALIZE_ATTEMPTS {
            match self
                .store
                .update_run(&run_id, RunUpdate::failed(message.clone()))
                .await
            {
                Ok(()) | Err(StoreError::RunFinalized(_)) => {
                    unrecorded = None;
                    break;
                }
                Err(update_err) => {
                    warn!(run_id = %run_id, attempt, error = %update_err, "could not mark run as failed");
                    unrecorded = Some(update_err);
                }
            }
        }

        publish(
            sink,
            ProgressEvent::Error {
                run_id: Some(run_id.clone()),
                message: message.clone(),
            },
        );

        match unrecorded {
            None => PipelineError::RunFailed { run_id, message },
            Some(cause) => {
                error!(run_id = %run_id, error = %cause, "run record left unfinalized");
                PipelineError::RunNotFinalized {
                    run_id,
                    message,
                    cause,
                }
            }
        }
    }
}
