use std::collections::BTreeMap;
use std::time::Duration;

use super::OutcomeEvent;

// ─── Running extrema ─────────────────────────────────────────────

/// Running max/min over a stream of durations.
///
/// Both ends start empty, so the first observation always wins the
/// comparison; after that only a strictly larger (smaller) value
/// replaces the current max (min).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extrema {
    max: Option<Duration>,
    min: Option<Duration>,
}

impl Extrema {
    pub fn observe(&mut self, d: Duration) {
        match self.max {
            Some(max) if d <= max => {}
            _ => self.max = Some(d),
        }
        match self.min {
            Some(min) if d >= min => {}
            _ => self.min = Some(d),
        }
    }

    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    pub fn min(&self) -> Option<Duration> {
        self.min
    }
}

// ─── Per-endpoint accumulator ────────────────────────────────────

/// Running statistics for one URL.
/// Created lazily on the first event for that URL; its identity
/// (`url`, `method`) is taken from that first event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAccumulator {
    pub url: String,
    pub method: String,
    pub total_requests: u64,
    pub total_duration: Duration,
    pub extrema: Extrema,
    /// HTTP status → occurrences
    pub status_histogram: BTreeMap<u16, u64>,
}

impl EndpointAccumulator {
    pub fn new(first: &OutcomeEvent) -> Self {
        Self {
            url: first.url.clone(),
            method: first.method.clone(),
            total_requests: 0,
            total_duration: Duration::ZERO,
            extrema: Extrema::default(),
            status_histogram: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, event: &OutcomeEvent) {
        self.total_requests += 1;
        self.total_duration = self.total_duration.saturating_add(event.duration);
        self.extrema.observe(event.duration);
        *self.status_histogram.entry(event.status).or_insert(0) += 1;
    }
}
