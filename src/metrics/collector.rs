use std::collections::BTreeMap;
use std::io::Write;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::endpoint::{EndpointAccumulator, Extrema};
use super::finalizer::{completion_channel, Completion, Finalizer};
use super::summary::RunSummary;
use super::OutcomeEvent;
use crate::error::SummaryError;

// ─── Lifecycle ───────────────────────────────────────────────────

/// Where the aggregator is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No event received yet; the run timer is not armed.
    Idle,
    /// At least one event received.
    Running,
    /// Inbound queue closed; no further events are accepted.
    Draining,
    /// Completion signaled.
    Done,
}

// ─── Raw run state ───────────────────────────────────────────────

/// Wall-clock anchor taken from the first event of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStart {
    pub instant: Instant,
    pub at: DateTime<Utc>,
}

/// Mutable accumulators for one run.
///
/// Owned by exactly one [`Aggregator`]; nothing here is derived.
/// Averages, rates and formatted durations only exist on the
/// [`RunSummary`] built from this once the queue is drained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub(crate) total_requests: u64,
    pub(crate) total_duration: Duration,
    pub(crate) extrema: Extrema,
    /// URL → method → requests
    pub(crate) endpoint_overview: BTreeMap<String, BTreeMap<String, u64>>,
    /// URL → accumulator
    pub(crate) endpoints: BTreeMap<String, EndpointAccumulator>,
    pub(crate) start: Option<RunStart>,
}

impl RunState {
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn start(&self) -> Option<RunStart> {
        self.start
    }

    fn arm_timer(&mut self) {
        self.start.get_or_insert_with(|| RunStart {
            instant: Instant::now(),
            at: Utc::now(),
        });
    }

    fn record(&mut self, event: OutcomeEvent) {
        // ── Global counters ─────────────────────────────────────
        self.total_requests += 1;
        self.total_duration = self.total_duration.saturating_add(event.duration);
        self.extrema.observe(event.duration);

        // ── Call-frequency overview ─────────────────────────────
        *self
            .endpoint_overview
            .entry(event.url.clone())
            .or_default()
            .entry(event.method.clone())
            .or_insert(0) += 1;

        // ── Per-endpoint accumulator ────────────────────────────
        self.endpoints
            .entry(event.url.clone())
            .or_insert_with(|| EndpointAccumulator::new(&event))
            .record(&event);
    }
}

// ─── Aggregator ──────────────────────────────────────────────────

/// Single consumer of the outcome queue.
///
/// The aggregator is the only writer of its [`RunState`], so the hot
/// path takes no locks and the first-event timer needs no once-guard.
#[derive(Debug)]
pub struct Aggregator {
    state: RunState,
    phase: Phase,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            state: RunState::default(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Read-only view of the accumulators collected so far.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Fold one event into the run. The first call arms the run timer.
    pub fn record(&mut self, event: OutcomeEvent) {
        match self.phase {
            Phase::Idle => {
                self.state.arm_timer();
                self.phase = Phase::Running;
                debug!(url = %event.url, "first outcome received, run timer armed");
            }
            Phase::Running => {}
            Phase::Draining | Phase::Done => {
                warn!(url = %event.url, phase = ?self.phase, "outcome after queue close ignored");
                return;
            }
        }
        self.state.record(event);
    }

    /// Pull events until the source is exhausted.
    pub async fn consume<S>(&mut self, events: S)
    where
        S: Stream<Item = OutcomeEvent>,
    {
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            self.record(event);
        }
    }

    /// Close the run to further events and hand over the raw state.
    pub fn drain(&mut self) -> RunState {
        self.phase = Phase::Draining;
        info!(
            total_requests = self.state.total_requests,
            endpoints = self.state.endpoints.len(),
            "outcome queue closed, summarizing results"
        );
        std::mem::take(&mut self.state)
    }

    /// Drain the run and finalize it exactly once. The phase reads
    /// `Done` afterwards, whatever the outcome; by then the completion
    /// signal has already been released.
    pub fn finish<W: Write>(
        &mut self,
        finalizer: Finalizer<W>,
    ) -> Result<RunSummary, SummaryError> {
        let state = self.drain();
        let result = finalizer.finish(state);
        self.phase = Phase::Done;
        result
    }
}

// ─── Spawn helper ────────────────────────────────────────────────

/// Spawns the aggregator on its own Tokio task, reading from `rx` and
/// writing the final report to `sink`.
///
/// The returned [`Completion`] resolves once the report has been
/// written, or once writing it has failed.
pub fn spawn_aggregator<W>(
    rx: mpsc::Receiver<OutcomeEvent>,
    sink: W,
) -> (JoinHandle<Result<RunSummary, SummaryError>>, Completion)
where
    W: Write + Send + 'static,
{
    let (done, completion) = completion_channel();
    let finalizer = Finalizer::new(sink, done);

    let handle = tokio::spawn(async move {
        debug!("aggregator starting");
        let mut aggregator = Aggregator::new();
        aggregator.consume(ReceiverStream::new(rx)).await;

        // The sink is blocking std::io, keep it off the async workers
        match tokio::task::spawn_blocking(move || aggregator.finish(finalizer)).await {
            Ok(result) => result,
            Err(e) => Err(SummaryError::Task(e)),
        }
    });

    (handle, completion)
}
