pub mod collector;
pub mod endpoint;
pub mod finalizer;
pub mod summary;

use std::time::Duration;

pub use collector::{spawn_aggregator, Aggregator, Phase, RunStart, RunState};
pub use endpoint::{EndpointAccumulator, Extrema};
pub use finalizer::{completion_channel, Completion, DoneSignal, Finalizer};
pub use summary::{format_duration, EndpointSummary, RunSummary};

/// One completed request, as observed by a worker.
/// This is the "write" side: producers build these and push them
/// onto the inbound queue; ownership moves to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeEvent {
    /// Target URL, e.g. "/api/users"
    pub url: String,
    /// HTTP method, e.g. "GET"
    pub method: String,
    /// HTTP response status
    pub status: u16,
    /// Wall time of the request
    pub duration: Duration,
}

impl OutcomeEvent {
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        status: u16,
        duration: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            status,
            duration,
        }
    }
}
