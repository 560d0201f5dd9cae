//! Concurrent batch execution with per-batch retry.
//!
//! Every batch is started at once and driven on the calling task through a
//! [`FuturesUnordered`]. A batch that keeps failing after its retry budget
//! contributes nothing and is counted; it never cancels its siblings.

use std::fmt;
use std::future::Future;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use super::retry::RetryPolicy;

/// Callback invoked once per settled batch with `(completed, total)`.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Aggregate result of one [`run_batches`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRun<O> {
    /// Outcomes of every successful batch, in completion order.
    pub outcomes: Vec<O>,
    /// Batches that exhausted their attempts.
    pub failures: usize,
    /// Batches dispatched.
    pub total_batches: usize,
}

impl<O> BatchRun<O> {
    /// Every dispatched batch failed.
    pub fn all_failed(&self) -> bool {
        self.total_batches > 0 && self.failures == self.total_batches
    }
}

/// Run `classify` over every batch concurrently.
///
/// `classify` receives the batch index and its items. Each batch is retried
/// according to `retry`, with the index as the backoff position.
/// `on_progress` fires exactly once per batch after its final attempt; the
/// `completed` argument counts settled batches and only grows.
pub async fn run_batches<'a, I, O, E, F, Fut>(
    batches: &'a [Vec<I>],
    classify: F,
    retry: &RetryPolicy,
    on_progress: Option<ProgressFn<'_>>,
) -> BatchRun<O>
where
    F: Fn(usize, &'a [I]) -> Fut,
    Fut: Future<Output = Result<Vec<O>, E>> + 'a,
    E: fmt::Display,
{
    let total = batches.len();
    let classify = &classify;

    let mut pending: FuturesUnordered<_> = batches
        .iter()
        .enumerate()
        .map(|(index, batch)| async move {
            let result = retry
                .run(index, |_attempt| classify(index, batch.as_slice()))
                .await;
            (index, result)
        })
        .collect();

    let mut run = BatchRun {
        outcomes: Vec::new(),
        failures: 0,
        total_batches: total,
    };
    let mut completed = 0;

    while let Some((index, result)) = pending.next().await {
        completed += 1;
        match result {
            Ok(mut outcomes) => {
                debug!(batch = index, outcomes = outcomes.len(), "batch settled");
                run.outcomes.append(&mut outcomes);
            }
            Err(exhausted) => {
                warn!(
                    batch = index,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "batch failed after retry"
                );
                run.failures += 1;
            }
        }
        if let Some(report) = on_progress {
            report(completed, total);
        }
    }

    run
}
