//! Simulated user orchestration.

use crate::config::Config;
use crate::error::Result;
use crate::pacing::Pacing;
use crate::payload::TrafficModel;
use crate::report::{LatencyStats, Report, TaskReport};
use crate::tasks::{TaskKind, TaskTable};
use crate::writer::{send_and_record, IngestClient, IngestError, IngestStats, LatencySenders};
use hdrhistogram::Histogram;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// One simulated user: selects a task, sends it, waits, repeats.
struct SimulatedUser {
    index: usize,
    rng: StdRng,
    model: TrafficModel,
    table: Arc<TaskTable>,
    pacing: Pacing,
    client: IngestClient,
    stats: Arc<IngestStats>,
    latencies: LatencySenders,
}

impl SimulatedUser {
    async fn run(mut self, deadline: Instant, shutdown: CancellationToken) {
        debug!(user = self.index, "Simulated user started");

        while Instant::now() < deadline && !shutdown.is_cancelled() {
            let task = self.table.select(&mut self.rng);
            let payload = self.model.payload_for(task, &mut self.rng);

            // An in-flight request always completes (bounded by the client
            // timeout) so the report counts everything the server saw.
            let result =
                send_and_record(&self.client, task, &payload, &self.stats, &self.latencies).await;

            match result {
                Ok(outcome) => {
                    trace!(user = self.index, task = %task, device_id = %payload.device_id, ?outcome, "Ingest sent")
                }
                Err(IngestError::ServerError { status, body }) => {
                    debug!(user = self.index, task = %task, status, body = %body, "Ingest rejected by server")
                }
                Err(e) => warn!(user = self.index, task = %task, "Ingest request failed: {}", e),
            }

            let wake = Instant::now()
                .checked_add(self.pacing.sample(&mut self.rng))
                .map_or(deadline, |wake| wake.min(deadline));
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep_until(wake) => {}
            }
        }

        debug!(user = self.index, "Simulated user finished");
    }
}

/// Derives a user's generator from the run seed, or from entropy when unseeded.
fn user_rng(seed: Option<u64>, index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => StdRng::from_entropy(),
    }
}

/// Runs the configured number of simulated users until the duration elapses
/// or `shutdown` is cancelled.
pub async fn run_workload(config: Config, shutdown: CancellationToken) -> Result<Report> {
    config.validate()?;

    let table = Arc::new(TaskTable::new(&config.tasks)?);
    let client = IngestClient::new(config.ingest_url(), config.timeout())?;
    let model = TrafficModel::new();
    let pacing = config.pacing();

    info!(
        "Starting {} simulated users against {} for {:?}",
        config.users,
        client.ingest_url(),
        config.duration()
    );
    info!(
        "Task weights: known_device={} unknown_device={}, pacing {:?}..{:?}",
        config.tasks.known_device, config.tasks.unknown_device, pacing.min, pacing.max
    );

    let stats = Arc::new(IngestStats::new());

    // Create latency channels
    let (known_tx, known_rx) = mpsc::unbounded_channel();
    let (unknown_tx, unknown_rx) = mpsc::unbounded_channel();
    let known_latency_handle = tokio::spawn(collect_latencies(known_rx, new_histogram()?));
    let unknown_latency_handle = tokio::spawn(collect_latencies(unknown_rx, new_histogram()?));
    let latencies = LatencySenders {
        known_device: known_tx,
        unknown_device: unknown_tx,
    };

    let start = Instant::now();
    let deadline = start + config.duration();

    let mut users = JoinSet::new();
    for index in 0..config.users {
        let user = SimulatedUser {
            index,
            rng: user_rng(config.seed, index),
            model,
            table: Arc::clone(&table),
            pacing,
            client: client.clone(),
            stats: Arc::clone(&stats),
            latencies: latencies.clone(),
        };
        users.spawn(user.run(deadline, shutdown.clone()));
    }
    // Collectors finish once every user has dropped its senders.
    drop(latencies);

    while let Some(res) = users.join_next().await {
        if let Err(e) = res {
            error!("Simulated user failed: {}", e);
        }
    }

    let elapsed = start.elapsed();
    let interrupted = shutdown.is_cancelled();
    info!(
        "Workload completed: {} requests in {:.1}s{}",
        stats.total_requests(),
        elapsed.as_secs_f64(),
        if interrupted { " (interrupted)" } else { "" }
    );

    let known_histogram = known_latency_handle.await?;
    let unknown_histogram = unknown_latency_handle.await?;

    Ok(Report {
        server_url: config.server_url.clone(),
        users: config.users,
        configured_duration: config.duration(),
        duration: elapsed,
        min_wait: pacing.min,
        max_wait: pacing.max,
        known_weight: config.tasks.known_device,
        unknown_weight: config.tasks.unknown_device,
        seed: config.seed,
        interrupted,
        bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
        known_device: task_report(&stats, TaskKind::KnownDevice, &known_histogram),
        unknown_device: task_report(&stats, TaskKind::UnknownDevice, &unknown_histogram),
    })
}

fn task_report(stats: &IngestStats, task: TaskKind, histogram: &Histogram<u64>) -> TaskReport {
    let counters = stats.counters(task);
    TaskReport {
        requests: counters.requests.load(Ordering::Relaxed),
        accepted: counters.accepted.load(Ordering::Relaxed),
        rejected: counters.rejected.load(Ordering::Relaxed),
        errors: counters.errors.load(Ordering::Relaxed),
        latency: compute_latency_stats(histogram),
    }
}

/// Histogram of request latencies in microseconds, 1us..60s.
fn new_histogram() -> Result<Histogram<u64>> {
    Ok(Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)?)
}

/// Collects latency samples into a histogram.
async fn collect_latencies(
    mut rx: mpsc::UnboundedReceiver<Duration>,
    mut histogram: Histogram<u64>,
) -> Histogram<u64> {
    while let Some(duration) = rx.recv().await {
        histogram.saturating_record(duration.as_micros() as u64);
    }

    histogram
}

/// Computes latency statistics from a histogram.
fn compute_latency_stats(histogram: &Histogram<u64>) -> LatencyStats {
    if histogram.is_empty() {
        return LatencyStats::default();
    }

    LatencyStats {
        count: histogram.len(),
        min_us: histogram.min(),
        max_us: histogram.max(),
        mean_us: histogram.mean() as u64,
        p50_us: histogram.value_at_quantile(0.50),
        p95_us: histogram.value_at_quantile(0.95),
        p99_us: histogram.value_at_quantile(0.99),
    }
}
