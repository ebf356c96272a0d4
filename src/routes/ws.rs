// WebSocket live vitals stream

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use super::http::alerts_for;
use crate::models::LiveUpdate;
use crate::readings_repo::ReadingsRepo;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the live connection count on drop (connect = +1, drop = -1).
struct LiveConnectionGuard(Arc<AtomicUsize>);

impl Drop for LiveConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_vitals(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tx = state.live_tx.clone();
    let conn_count = state.live_connections.clone();
    let repo = state.readings_repo.clone();
    ws.on_upgrade(move |socket| async move {
        // Subscribe before reading the latest row so nothing ingested in between is missed.
        let mut rx = tx.subscribe();
        if let Err(e) = stream_vitals(socket, &mut rx, conn_count, repo).await {
            tracing::info!("Vitals stream error: {}", e);
        }
    })
}

async fn send_text(socket: &mut WebSocket, json: String) -> bool {
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    matches!(r, Ok(Ok(())))
}

async fn stream_vitals(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<LiveUpdate>,
    conn_count: Arc<AtomicUsize>,
    repo: Arc<ReadingsRepo>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, Ordering::Relaxed);
    let _guard = LiveConnectionGuard(conn_count);
    tracing::info!("Client connected to vitals stream");

    let latest = repo.latest_reading().await?;
    let welcome = serde_json::json!({
        "type": "latest",
        "reading": latest,
        "alerts": alerts_for(latest.as_ref()),
    });
    if !send_text(&mut socket, serde_json::to_string(&welcome)?).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(update) => {
                        let msg = serde_json::json!({
                            "type": "reading",
                            "reading": update.reading,
                            "alerts": update.alerts,
                        });
                        if !send_text(&mut socket, serde_json::to_string(&msg)?).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/vitals client lagged, skipped {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    Ok(())
}
