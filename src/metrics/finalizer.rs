use std::io::Write;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, error};

use super::collector::RunState;
use super::summary::RunSummary;
use crate::error::SummaryError;

// ─── Completion signal ───────────────────────────────────────────

/// Write half of the completion signal.
///
/// Never sends; the signal is raised by dropping it, which closes the
/// channel for every [`Completion`] clone. Dropping can only happen
/// once, so the signal fires exactly once per run.
#[derive(Debug)]
pub struct DoneSignal {
    _tx: watch::Sender<()>,
}

impl Drop for DoneSignal {
    fn drop(&mut self) {
        debug!("run complete, releasing waiters");
    }
}

/// Read half of the completion signal.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<()>,
}

impl Completion {
    /// Resolves once the paired [`DoneSignal`] has been dropped.
    pub async fn wait(mut self) {
        while self.rx.changed().await.is_ok() {}
    }

    pub fn is_complete(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

pub fn completion_channel() -> (DoneSignal, Completion) {
    let (tx, rx) = watch::channel(());
    (DoneSignal { _tx: tx }, Completion { rx })
}

// ─── Finalizer ───────────────────────────────────────────────────

/// Turns drained run state into the final report, writes it to
/// `sink` and raises the completion signal.
pub struct Finalizer<W> {
    sink: W,
    done: DoneSignal,
}

impl<W: Write> Finalizer<W> {
    pub fn new(sink: W, done: DoneSignal) -> Self {
        Self { sink, done }
    }

    /// Runs once per run (consumes `self`). The completion signal is
    /// raised on every return path, including write failures.
    pub fn finish(self, state: RunState) -> Result<RunSummary, SummaryError> {
        let Finalizer { mut sink, done } = self;
        let _release = done;

        let summary = RunSummary::build(state, Instant::now());

        debug!(
            total_requests = summary.total_requests,
            run_duration = %summary.run_duration,
            rate_per_sec = summary.request_rate_per_sec,
            "run summary computed"
        );
        for ep in summary.endpoints.values() {
            debug!(
                url = %ep.url,
                method = %ep.method,
                total_requests = ep.total_requests,
                avg = %ep.avg_duration,
                "endpoint summary"
            );
        }

        if let Err(e) = emit(&mut sink, &summary) {
            error!(error = %e, "failed to emit run summary");
            return Err(e);
        }
        Ok(summary)
    }
}

/// One JSON document plus newline, flushed.
fn emit<W: Write>(sink: &mut W, summary: &RunSummary) -> Result<(), SummaryError> {
    let json = serde_json::to_string(summary)?;
    writeln!(sink, "{json}")?;
    sink.flush()?;
    Ok(())
}
