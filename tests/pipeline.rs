use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rqst_summary::config::{EndpointTarget, RunConfig};
use rqst_summary::{load_generator, spawn_aggregator, OutcomeEvent, SummaryError};
use tokio::sync::mpsc;

/// Cloneable in-memory sink standing in for stdout.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn ev(url: &str, method: &str, status: u16, ms: u64) -> OutcomeEvent {
    OutcomeEvent::new(url, method, status, Duration::from_millis(ms))
}

#[tokio::test]
async fn worked_example_end_to_end() {
    let sink = SharedBuf::default();
    let (tx, rx) = mpsc::channel(4);
    let (handle, completion) = spawn_aggregator(rx, sink.clone());

    tx.send(ev("/a", "GET", 200, 10)).await.unwrap();
    tx.send(ev("/a", "GET", 500, 30)).await.unwrap();
    tx.send(ev("/b", "POST", 201, 20)).await.unwrap();
    drop(tx);

    completion.wait().await;
    let summary = handle.await.unwrap().unwrap();

    let text = sink.text();
    assert_eq!(text.lines().count(), 1);
    let report: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();

    assert_eq!(report["TotalRqsts"], 3);
    assert_eq!(report["MaxRqstDuration"], "30ms");
    assert_eq!(report["MinRqstDuration"], "10ms");
    assert_eq!(report["AvgRqstDuration"], "20ms");
    assert_eq!(report["EndpointOverviewSummary"]["/a"]["GET"], 2);
    assert_eq!(report["EndpointOverviewSummary"]["/b"]["POST"], 1);

    let a = &report["EndpointRunSummary"]["/a"];
    assert_eq!(a["TotalRqsts"], 2);
    assert_eq!(a["HTTPStatusDist"]["200"], 1);
    assert_eq!(a["HTTPStatusDist"]["500"], 1);

    let b = &report["EndpointRunSummary"]["/b"];
    assert_eq!(b["TotalRqsts"], 1);
    assert_eq!(b["HTTPStatusDist"]["201"], 1);

    assert_eq!(summary.total_requests, 3);
}

#[tokio::test]
async fn zero_event_run_completes() {
    let sink = SharedBuf::default();
    let (tx, rx) = mpsc::channel::<OutcomeEvent>(1);
    let (handle, completion) = spawn_aggregator(rx, sink.clone());
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), completion.wait())
        .await
        .expect("completion never raised");
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.total_requests, 0);
    assert_eq!(summary.request_rate_per_sec, 0.0);
    assert_eq!(summary.run_duration, "0s");

    let report: serde_json::Value = serde_json::from_str(sink.text().trim_end()).unwrap();
    assert_eq!(report["TotalRqsts"], 0);
    assert_eq!(report["RqstRatePerSec"], 0.0);
    assert!(report["StartedAt"].is_null());
    assert!(report["EndpointRunSummary"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn failed_write_still_releases_waiters() {
    let (tx, rx) = mpsc::channel(1);
    let (handle, completion) = spawn_aggregator(rx, ClosedPipe);

    tx.send(ev("/a", "GET", 200, 1)).await.unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), completion.wait())
        .await
        .expect("completion never raised");
    let result = handle.await.unwrap();
    assert!(matches!(result, Err(SummaryError::Write(_))));
}

#[tokio::test]
async fn concurrent_producers_are_fully_counted() {
    let config = Arc::new(RunConfig {
        workers: 16,
        requests_per_worker: 250,
        queue_capacity: 32,
        error_pct: 20,
        endpoints: vec![
            EndpointTarget::new("GET", "/api/users"),
            EndpointTarget::new("POST", "/api/orders"),
            EndpointTarget::new("GET", "/api/orders"),
        ],
        seed: 1,
    });

    let sink = SharedBuf::default();
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let (handle, completion) = spawn_aggregator(rx, sink.clone());

    load_generator::run(config.clone(), tx).await;
    completion.wait().await;
    let summary = handle.await.unwrap().unwrap();

    let n = config.total_requests();
    assert_eq!(summary.total_requests, n);
    assert_eq!(
        summary.endpoints.values().map(|e| e.total_requests).sum::<u64>(),
        n
    );
    for ep in summary.endpoints.values() {
        assert_eq!(ep.status_histogram.values().sum::<u64>(), ep.total_requests);
    }

    let overview_total: u64 = summary
        .endpoint_overview
        .values()
        .flat_map(|methods| methods.values())
        .sum();
    assert_eq!(overview_total, n);

    // "/api/orders" is hit with two methods but has one accumulator
    assert_eq!(summary.endpoint_overview["/api/orders"].len(), 2);
    assert_eq!(summary.endpoints.len(), 2);

    assert_eq!(sink.text().lines().count(), 1);
}

/// Millisecond value of a sub-second rendered duration.
fn rendered_ms(s: &str) -> f64 {
    if let Some(v) = s.strip_suffix("ns") {
        v.parse::<f64>().unwrap() / 1_000_000.0
    } else if let Some(v) = s.strip_suffix("µs") {
        v.parse::<f64>().unwrap() / 1_000.0
    } else if let Some(v) = s.strip_suffix("ms") {
        v.parse::<f64>().unwrap()
    } else if s == "0s" {
        0.0
    } else {
        panic!("unexpected run duration {s}");
    }
}

#[tokio::test]
async fn run_duration_starts_at_first_event() {
    let (tx, rx) = mpsc::channel(1);
    let (handle, completion) = spawn_aggregator(rx, SharedBuf::default());

    // idle time before the first event must not count
    tokio::time::sleep(Duration::from_millis(150)).await;
    tx.send(ev("/a", "GET", 200, 1)).await.unwrap();
    drop(tx);

    completion.wait().await;
    let summary = handle.await.unwrap().unwrap();

    assert!(summary.started_at.is_some());
    let ms = rendered_ms(&summary.run_duration);
    assert!(ms < 50.0, "run duration {} includes idle time", summary.run_duration);
}
