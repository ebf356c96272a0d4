use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use vitalwatch::*;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (tx, _) = broadcast::channel::<models::LiveUpdate>(app_config.live.broadcast_capacity);

    let readings_repo = Arc::new(
        readings_repo::ReadingsRepo::connect_with_pool_size(
            &app_config.database.path,
            app_config.database.retention_days,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    readings_repo.init().await?;
    tracing::info!(
        readings = readings_repo.count_readings().await?,
        path = %app_config.database.path,
        "readings store ready"
    );

    let session = Arc::new(
        session::Session::load(
            readings_repo.kv_store(),
            session::AccessGate::new(app_config.access.code.clone()),
        )
        .await?,
    );
    let relay = Arc::new(
        relay::ReportRelay::new(
            &app_config.relay.endpoint,
            Duration::from_secs(app_config.relay.timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("relay client: {}", e))?,
    );
    let prediction = Arc::new(
        prediction::PredictionClient::new(
            &app_config.prediction.endpoint,
            Duration::from_secs(app_config.prediction.timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("prediction client: {}", e))?,
    );
    if app_config.patient.is_none() {
        tracing::warn!("no [patient] configured; reports use the reduced layout and cannot be sent");
    }

    let live_connections = Arc::new(AtomicUsize::new(0));
    let readings_ingested_total = Arc::new(AtomicU64::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            readings_repo: readings_repo.clone(),
            live_connections: live_connections.clone(),
            readings_ingested_total: readings_ingested_total.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            prune_interval_secs: app_config.monitoring.prune_interval_secs,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
            vacuum_schedule: app_config.database.vacuum_schedule.clone(),
        },
    );

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let app = routes::app(routes::AppDeps {
        live_tx: tx,
        readings_repo,
        session,
        relay,
        prediction,
        renderer: Arc::new(export::TextRenderer),
        live_connections,
        readings_ingested_total,
        config: app_config,
    });
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM (falls back to Ctrl-C only if SIGTERM cannot be installed).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
