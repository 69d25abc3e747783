use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{EndpointTarget, RunConfig};
use crate::metrics::OutcomeEvent;

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `config.workers` Tokio tasks that each push
/// `config.requests_per_worker` synthetic outcomes into `tx`.
///
/// Returns once every worker has finished. Every sender clone is
/// dropped by then, which closes the queue for the aggregator.
pub async fn run(config: Arc<RunConfig>, tx: mpsc::Sender<OutcomeEvent>) {
    let mut handles = Vec::with_capacity(config.workers as usize);

    for worker_id in 0..config.workers {
        let config = config.clone();
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, config, tx).await;
        }));
    }
    drop(tx);

    // Wait for all workers to finish, however they ended
    for h in handles {
        if let Err(e) = h.await {
            warn!(error = %e, "producer task failed");
        }
    }

    info!(workers = config.workers, "all producers finished, outcome queue closed");
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, config: Arc<RunConfig>, tx: mpsc::Sender<OutcomeEvent>) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(u64::from(id)));

    if config.endpoints.is_empty() {
        warn!(worker = id, "no endpoints configured, producer idle");
        return;
    }

    for _ in 0..config.requests_per_worker {
        let target = &config.endpoints[rng.gen_range(0..config.endpoints.len())];
        let event = synthesize(&mut rng, target, config.error_pct);

        if tx.send(event).await.is_err() {
            debug!(worker = id, "outcome queue closed, producer stopping early");
            return;
        }
    }
}

// ─── Synthetic outcome ───────────────────────────────────────────

fn synthesize(rng: &mut StdRng, target: &EndpointTarget, error_pct: u8) -> OutcomeEvent {
    let status = if rng.gen_range(0u8..100) < error_pct {
        if rng.gen_bool(0.5) { 500 } else { 503 }
    } else if target.method == "POST" {
        201
    } else {
        200
    };

    // 200 μs – 50 ms, skewed towards the fast end
    let base_us: u64 = rng.gen_range(200..2_000);
    let tail_us: u64 = if rng.gen_bool(0.1) {
        rng.gen_range(0..48_000)
    } else {
        0
    };

    OutcomeEvent {
        url: target.url.clone(),
        method: target.method.clone(),
        status,
        duration: Duration::from_micros(base_us + tail_us),
    }
}
