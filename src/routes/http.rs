// HTTP handlers: access gate, readings, analysis views, reports, prediction, notes

use std::sync::atomic::Ordering;

use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::analysis;
use crate::export::{self, DocumentRenderer};
use crate::models::{
    AlertView, LiveUpdate, PostureDistribution, ReportDocument, TrendSummary, VitalReading,
};
use crate::prediction::Prediction;
use crate::relay::ReportEmail;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    code: String,
}

pub(super) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.session.login(&req.code).await? {
        return Err(ApiError::InvalidCode);
    }
    Ok(Json(serde_json::json!({ "authenticated": true })))
}

pub(super) async fn logout(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.session.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LatestVitals {
    reading: Option<VitalReading>,
    alerts: Vec<AlertView>,
}

pub(super) fn alerts_for(reading: Option<&VitalReading>) -> Vec<AlertView> {
    analysis::evaluate(reading)
        .into_iter()
        .map(AlertView::from)
        .collect()
}

/// GET /api/vitals/latest: most recent reading and its alerts (reading null when none).
pub(super) async fn latest_vitals(
    State(state): State<AppState>,
) -> Result<Json<LatestVitals>, ApiError> {
    let reading = state.readings_repo.latest_reading().await?;
    let alerts = alerts_for(reading.as_ref());
    Ok(Json(LatestVitals { reading, alerts }))
}

/// POST /api/readings: validate a raw row, store it and push it to live subscribers.
pub(super) async fn ingest_reading(
    State(state): State<AppState>,
    Json(raw): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<LiveUpdate>), ApiError> {
    let reading = VitalReading::parse(&raw)?;
    state.readings_repo.insert_reading(&reading).await?;
    state
        .readings_ingested_total
        .fetch_add(1, Ordering::Relaxed);

    let update = LiveUpdate {
        alerts: alerts_for(Some(&reading)),
        reading,
    };
    if state.live_tx.send(update.clone()).is_err() {
        tracing::debug!(
            operation = "broadcast_reading",
            "No live subscribers; broadcast channel has no receivers"
        );
    }
    Ok((StatusCode::CREATED, Json(update)))
}

/// Window selection: explicit `from`/`to` (RFC 3339), else the last `days` days.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WindowQuery {
    pub(crate) days: Option<u32>,
    pub(crate) from: Option<DateTime<Utc>>,
    pub(crate) to: Option<DateTime<Utc>>,
}

/// Inclusive [from, to] in epoch milliseconds.
pub(crate) fn resolve_window(
    q: &WindowQuery,
    now: DateTime<Utc>,
    default_days: u32,
) -> Result<(i64, i64), ApiError> {
    let days = q.days.unwrap_or(default_days);
    if days == 0 {
        return Err(ApiError::BadRequest("days must be > 0".to_string()));
    }
    let to = q.to.unwrap_or(now);
    let from = match q.from {
        Some(from) => from,
        None => TimeDelta::try_days(days as i64)
            .and_then(|span| to.checked_sub_signed(span))
            .ok_or_else(|| ApiError::BadRequest(format!("days out of range: {}", days)))?,
    };
    if from > to {
        return Err(ApiError::BadRequest(format!(
            "from ({}) is after to ({})",
            from.to_rfc3339(),
            to.to_rfc3339()
        )));
    }
    Ok((from.timestamp_millis(), to.timestamp_millis()))
}

async fn fetch_window(state: &AppState, q: &WindowQuery) -> Result<Vec<VitalReading>, ApiError> {
    let (from, to) = resolve_window(q, Utc::now(), state.config.analysis.default_window_days)?;
    Ok(state.readings_repo.readings_in_range(from, to).await?)
}

pub(super) async fn list_readings(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<Vec<VitalReading>>, ApiError> {
    Ok(Json(fetch_window(&state, &q).await?))
}

pub(super) async fn trends(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<TrendSummary>, ApiError> {
    let window = fetch_window(&state, &q).await?;
    Ok(Json(analysis::summarize_with(
        &window,
        state.config.analysis.average_mode,
    )))
}

pub(super) async fn posture(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<PostureDistribution>, ApiError> {
    let window = fetch_window(&state, &q).await?;
    Ok(Json(analysis::distribute(&window)))
}

async fn build_report(state: &AppState, q: &WindowQuery) -> Result<ReportDocument, ApiError> {
    let window = fetch_window(state, q).await?;
    let latest = state.readings_repo.latest_reading().await?;
    let doc = analysis::assemble(state.config.patient.as_ref(), latest.as_ref(), &window)
        .with_template(&state.config.report_template)
        .stamped(Utc::now());
    Ok(doc)
}

/// GET /api/report: the assembled document as JSON, for an external renderer.
pub(super) async fn report(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<ReportDocument>, ApiError> {
    Ok(Json(build_report(&state, &q).await?))
}

fn attachment(content_type: &str, file_name: &str) -> [(header::HeaderName, String); 2] {
    [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
    ]
}

/// GET /api/report/download: the report rendered by the configured renderer.
pub(super) async fn report_download(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = build_report(&state, &q).await?;
    let bytes = state.renderer.render(&doc)?;
    let file_name = format!(
        "{}.{}",
        export::report_file_stem(state.config.patient.as_ref()),
        state.renderer.file_extension()
    );
    Ok((attachment(state.renderer.content_type(), &file_name), bytes))
}

/// GET /api/report/csv: the window as Time, Temperature, Position.
pub(super) async fn report_csv(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = fetch_window(&state, &q).await?;
    let file_name = format!(
        "{}.csv",
        export::report_file_stem(state.config.patient.as_ref())
    );
    Ok((
        attachment("text/csv; charset=utf-8", &file_name),
        export::trend_csv(&window),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SendReportRequest {
    #[serde(default)]
    recipient_email: Option<String>,
    #[serde(default)]
    remarks: Option<String>,
    #[serde(default)]
    days: Option<u32>,
}

/// POST /api/report/send: render the report and hand it to the email relay.
pub(super) async fn send_report(
    State(state): State<AppState>,
    Json(req): Json<SendReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(patient) = state.config.patient.as_ref() else {
        return Err(ApiError::Conflict(
            "no patient configured; reports can only be downloaded".to_string(),
        ));
    };
    let recipient = req
        .recipient_email
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| state.config.relay.default_recipient.clone());
    if !recipient.contains('@') {
        return Err(ApiError::BadRequest(format!(
            "invalid recipient email: {}",
            recipient
        )));
    }

    let q = WindowQuery {
        days: req.days,
        ..Default::default()
    };
    let doc = build_report(&state, &q).await?;
    let bytes = state.renderer.render(&doc)?;
    let email = ReportEmail::new(recipient, patient.patient_id.clone(), req.remarks, &bytes);
    state.relay.send(&email).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/predict: forward the uploaded `file` field to the prediction service.
pub(super) async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Prediction>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let prediction = state.prediction.predict(&file_name, bytes.to_vec()).await?;
        return Ok(Json(prediction));
    }
    Err(ApiError::BadRequest("missing multipart field: file".to_string()))
}

#[derive(Debug, Serialize)]
pub(super) struct NotesResponse {
    notes: Vec<String>,
}

pub(super) async fn list_notes(State(state): State<AppState>) -> Json<NotesResponse> {
    Json(NotesResponse {
        notes: state.session.notes().await,
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct NoteRequest {
    text: String,
}

pub(super) async fn add_note(
    State(state): State<AppState>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<NotesResponse>, ApiError> {
    match state.session.add_note(&req.text).await? {
        Some(notes) => Ok(Json(NotesResponse { notes })),
        None => Err(ApiError::BadRequest("note is empty".to_string())),
    }
}
