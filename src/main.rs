use std::process::ExitCode;
use std::sync::Arc;

use rqst_summary::config::RunConfig;
use rqst_summary::{load_generator, spawn_aggregator, telemetry};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_logging();

    // ── 1. Load run configuration ────────────────────────────────
    let config = match std::env::args().nth(1) {
        Some(path) => match RunConfig::from_file(&path) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "cannot load run configuration");
                return ExitCode::FAILURE;
            }
        },
        None => RunConfig::default(),
    };
    let config = Arc::new(config);

    info!(
        workers = config.workers,
        requests_per_worker = config.requests_per_worker,
        endpoints = config.endpoints.len(),
        "starting run"
    );

    // ── 2. Outcome queue + aggregator ────────────────────────────
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let (handle, completion) = spawn_aggregator(rx, std::io::stdout());

    // ── 3. Producers; the queue closes when the last one ends ────
    load_generator::run(config, tx).await;

    // ── 4. Wait for the report ───────────────────────────────────
    completion.wait().await;

    match handle.await {
        Ok(Ok(summary)) => {
            info!(
                total_requests = summary.total_requests,
                rate_per_sec = summary.request_rate_per_sec,
                "run finished"
            );
            ExitCode::SUCCESS
        }
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "aggregator task failed");
            ExitCode::FAILURE
        }
    }
}
