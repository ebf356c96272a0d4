// HTTP + WebSocket routes

mod error;
mod http;
mod ws;

pub use error::ApiError;

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::export::DocumentRenderer;
use crate::models::LiveUpdate;
use crate::prediction::PredictionClient;
use crate::readings_repo::ReadingsRepo;
use crate::relay::ReportRelay;
use crate::session::Session;

/// Everything the router needs; built once in main (or a test).
pub struct AppDeps {
    pub live_tx: broadcast::Sender<LiveUpdate>,
    pub readings_repo: Arc<ReadingsRepo>,
    pub session: Arc<Session>,
    pub relay: Arc<ReportRelay>,
    pub prediction: Arc<PredictionClient>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub live_connections: Arc<AtomicUsize>,
    pub readings_ingested_total: Arc<AtomicU64>,
    pub config: AppConfig,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) live_tx: broadcast::Sender<LiveUpdate>,
    pub(crate) readings_repo: Arc<ReadingsRepo>,
    pub(crate) session: Arc<Session>,
    pub(crate) relay: Arc<ReportRelay>,
    pub(crate) prediction: Arc<PredictionClient>,
    pub(crate) renderer: Arc<dyn DocumentRenderer>,
    pub(crate) live_connections: Arc<AtomicUsize>,
    pub(crate) readings_ingested_total: Arc<AtomicU64>,
    pub(crate) config: Arc<AppConfig>,
}

pub fn app(deps: AppDeps) -> Router {
    let state = AppState {
        live_tx: deps.live_tx,
        readings_repo: deps.readings_repo,
        session: deps.session,
        relay: deps.relay,
        prediction: deps.prediction,
        renderer: deps.renderer,
        live_connections: deps.live_connections,
        readings_ingested_total: deps.readings_ingested_total,
        config: Arc::new(deps.config),
    };

    let protected = Router::new()
        .route("/api/vitals/latest", get(http::latest_vitals)) // GET latest reading + alerts
        .route(
            "/api/readings",
            get(http::list_readings).post(http::ingest_reading),
        )
        .route("/api/trends", get(http::trends))
        .route("/api/posture", get(http::posture))
        .route("/api/report", get(http::report))
        .route("/api/report/download", get(http::report_download))
        .route("/api/report/csv", get(http::report_csv))
        .route("/api/report/send", post(http::send_report))
        .route("/api/predict", post(http::predict))
        .route("/api/notes", get(http::list_notes).post(http::add_note))
        .route("/ws/vitals", get(ws::ws_vitals)) // WS live readings
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    Router::new()
        .route("/", get(|| async { "vitalwatch: patient vitals monitor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/login", post(http::login))
        .route("/api/logout", post(http::logout))
        .merge(protected)
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Rejects requests until the session holds the access flag.
async fn require_access(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.session.is_authenticated().await {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}
