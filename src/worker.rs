// Background maintenance: retention pruning, periodic app stats, scheduled VACUUM.
// Ingest happens in the HTTP handler; this task only keeps the store tidy.

use crate::readings_repo::ReadingsRepo;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

/// Repo, counters and shutdown for the worker.
pub struct WorkerDeps {
    pub readings_repo: Arc<ReadingsRepo>,
    pub live_connections: Arc<AtomicUsize>,
    pub readings_ingested_total: Arc<AtomicU64>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing. All intervals are real seconds.
pub struct WorkerConfig {
    pub prune_interval_secs: u64,
    pub stats_log_interval_secs: u64,
    /// Cron expression for VACUUM (local time); None disables it.
    pub vacuum_schedule: Option<String>,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        readings_repo,
        live_connections,
        readings_ingested_total,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        prune_interval_secs,
        stats_log_interval_secs,
        vacuum_schedule,
    } = config;

    tokio::spawn(async move {
        let mut prune_tick = interval(Duration::from_secs(prune_interval_secs));
        prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
        let vacuum_handle = vacuum_schedule.map(|s| tokio::spawn(vacuum_scheduler(s, vacuum_tx)));

        let mut prune_passes: u64 = 0;
        let mut readings_pruned_total: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("Worker shutting down");
                    break;
                }
                _ = prune_tick.tick() => {
                    match readings_repo.prune_old_data().await {
                        Ok(n) => {
                            prune_passes += 1;
                            readings_pruned_total += n;
                            debug!(operation = "prune_old_data", pruned = n, "Old readings pruned");
                        }
                        Err(e) => {
                            warn!(error = %e, operation = "prune_old_data", "Failed to prune old readings");
                        }
                    }
                }
                _ = stats_log_tick.tick() => {
                    info!(
                        live_clients = live_connections.load(Ordering::Relaxed),
                        readings_ingested_total = readings_ingested_total.load(Ordering::Relaxed),
                        readings_pruned_total,
                        prune_passes,
                        "app stats"
                    );
                }
                Some(()) = vacuum_rx.recv() => {
                    if let Err(e) = readings_repo.vacuum().await {
                        warn!(error = %e, "vacuum failed");
                    } else {
                        info!("vacuum complete");
                    }
                }
            }
        }
        if let Some(h) = vacuum_handle {
            h.abort();
        }
    })
}

/// Sends on `tx` at each scheduled VACUUM time. Uses local time for cron.
async fn vacuum_scheduler(cron_str: String, tx: tokio::sync::mpsc::Sender<()>) {
    let Ok(schedule) = cron::Schedule::from_str(&cron_str) else {
        warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
        return;
    };
    loop {
        let now = chrono::Local::now();
        match schedule.after(&now).next() {
            Some(next) => {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
            None => tokio::time::sleep(Duration::from_secs(3600)).await,
        }
    }
}
