//! Progress delivery to the invoking caller.
//!
//! The pipeline hands each [`ProgressEvent`] to an optional [`ProgressSink`].
//! Implementations are provided for closures, unbounded tokio channels and
//! line-delimited JSON writers ([`NdjsonSink`]). Every event is also logged
//! through `tracing`, sink or not.

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use sortbox_types::ProgressEvent;

/// Receives pipeline step events. Delivery is best-effort and never fails
/// the run.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: &ProgressEvent) {
        self(event)
    }
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn emit(&self, event: &ProgressEvent) {
        if self.send(event.clone()).is_err() {
            debug!(step = event.step(), "progress receiver dropped");
        }
    }
}

/// Writes one JSON object per line to `W`, flushing after each event.
pub struct NdjsonSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_line(&self, event: &ProgressEvent) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(writer, "{line}")?;
        writer.flush()
    }
}

impl<W: Write + Send> ProgressSink for NdjsonSink<W> {
    fn emit(&self, event: &ProgressEvent) {
        if let Err(e) = self.write_line(event) {
            warn!(step = event.step(), error = %e, "failed to write progress event");
        }
    }
}

/// Log `event` and forward it to `sink` when present.
pub(crate) fn publish(sink: Option<&dyn ProgressSink>, event: ProgressEvent) {
    match &event {
        ProgressEvent::Progress { classified, total } => {
            debug!(classified, total, "classification progress");
        }
        ProgressEvent::Error { run_id, message } => {
            warn!(run_id = run_id.as_deref().unwrap_or("-"), %message, "classification error");
        }
        other => info!(step = other.step(), "{}", other.summary()),
    }
    if let Some(sink) = sink {
        sink.emit(&event);
    }
}
