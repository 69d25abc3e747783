use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::collector::RunState;
use super::endpoint::EndpointAccumulator;

/// Runs shorter than this report a request rate of zero.
const MIN_RATE_WINDOW: Duration = Duration::from_millis(1);

// ─── Public report types ─────────────────────────────────────────

/// Final report for one endpoint. Every duration is pre-rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Method")]
    pub method: String,
    /// HTTP status → occurrences
    #[serde(rename = "HTTPStatusDist")]
    pub status_histogram: BTreeMap<u16, u64>,
    #[serde(rename = "TotalRqsts")]
    pub total_requests: u64,
    #[serde(rename = "TotalRequestDuration")]
    pub total_duration: String,
    #[serde(rename = "MaxRqstDuration")]
    pub max_duration: String,
    #[serde(rename = "MinRqstDuration")]
    pub min_duration: String,
    #[serde(rename = "AvgRqstDuration")]
    pub avg_duration: String,
}

/// Final report for a whole run, emitted once as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    #[serde(rename = "RqstRatePerSec")]
    pub request_rate_per_sec: f64,
    /// From the first received outcome to finalization
    #[serde(rename = "RunDuration")]
    pub run_duration: String,
    /// Wall-clock time of the first received outcome
    #[serde(rename = "StartedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "TotalRqsts")]
    pub total_requests: u64,
    #[serde(rename = "TotalRequestDuration")]
    pub total_duration: String,
    #[serde(rename = "MaxRqstDuration")]
    pub max_duration: String,
    #[serde(rename = "MinRqstDuration")]
    pub min_duration: String,
    #[serde(rename = "AvgRqstDuration")]
    pub avg_duration: String,
    /// URL → method → requests
    #[serde(rename = "EndpointOverviewSummary")]
    pub endpoint_overview: BTreeMap<String, BTreeMap<String, u64>>,
    /// URL → endpoint report
    #[serde(rename = "EndpointRunSummary")]
    pub endpoints: BTreeMap<String, EndpointSummary>,
}

// ─── Raw state → report ──────────────────────────────────────────

impl RunSummary {
    /// Derive the report from drained state, treating `finished_at`
    /// as the end of the run.
    pub fn build(state: RunState, finished_at: Instant) -> Self {
        let run_duration = state
            .start
            .map(|s| finished_at.saturating_duration_since(s.instant))
            .unwrap_or(Duration::ZERO);

        let request_rate_per_sec = if run_duration >= MIN_RATE_WINDOW {
            state.total_requests as f64 / run_duration.as_secs_f64()
        } else {
            0.0
        };

        let endpoints = state
            .endpoints
            .into_iter()
            .map(|(url, acc)| (url, EndpointSummary::from(acc)))
            .collect();

        Self {
            request_rate_per_sec,
            run_duration: format_duration(run_duration),
            started_at: state.start.map(|s| s.at),
            total_requests: state.total_requests,
            total_duration: format_duration(state.total_duration),
            max_duration: format_duration(state.extrema.max().unwrap_or_default()),
            min_duration: format_duration(state.extrema.min().unwrap_or_default()),
            avg_duration: format_duration(average(state.total_duration, state.total_requests)),
            endpoint_overview: state.endpoint_overview,
            endpoints,
        }
    }
}

impl From<EndpointAccumulator> for EndpointSummary {
    fn from(acc: EndpointAccumulator) -> Self {
        Self {
            avg_duration: format_duration(average(acc.total_duration, acc.total_requests)),
            max_duration: format_duration(acc.extrema.max().unwrap_or_default()),
            min_duration: format_duration(acc.extrema.min().unwrap_or_default()),
            total_duration: format_duration(acc.total_duration),
            total_requests: acc.total_requests,
            status_histogram: acc.status_histogram,
            method: acc.method,
            url: acc.url,
        }
    }
}

/// Truncating mean; zero when nothing was counted.
fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

// ─── Duration rendering ──────────────────────────────────────────

/// Renders a duration the way latency tools usually print them:
/// `0s`, `850ns`, `1.5µs`, `12.25ms`, `1.5s`, `1m30s`, `2h0m5s`.
///
/// Sub-second values use the largest unit that keeps the integer
/// part non-zero; from one second up the value is split into
/// hours, minutes and fractional seconds.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_owned();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let secs = d.as_secs();
    let (hours, mins) = (secs / 3600, (secs % 3600) / 60);
    let rest = u128::from(secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || mins > 0 {
        let _ = write!(out, "{mins}m");
    }
    let _ = write!(out, "{}s", decimal(rest, 1_000_000_000));
    out
}

/// `value / unit` as a decimal string with trailing zeros dropped.
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
