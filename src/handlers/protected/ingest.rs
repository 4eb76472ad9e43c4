// handlers/protected/ingest.rs - Media ingestion job control and status
//
// GET  /api/ingest/status   pull-based job status (source of truth)
// POST /api/ingest/start    start a run, optionally as a dry run
// POST /api/ingest/cancel   cancel the running job
// GET  /api/ingest/events   server-sent progress events, proxied as a stream

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::Identity;
use crate::backend::JobStatus;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartIngestRequest {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub since: Option<DateTime<Utc>>,
}

pub async fn status(State(state): State<AppState>, identity: Identity) -> ApiResult<JobStatus> {
    let status = state.backend.with_token(identity.token).ingest_status().await?;
    Ok(ApiResponse::success(status))
}

/// POST /api/ingest/start
///
/// Expected Input (optional body):
/// ```json
/// { "dry_run": true }
/// ```
///
/// A run already in progress answers 409 with the backend's message.
pub async fn start(
    State(state): State<AppState>,
    identity: Identity,
    body: Option<Json<StartIngestRequest>>,
) -> ApiResult<Value> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    tracing::info!(subject = %identity.subject, dry_run = request.dry_run, "starting ingest");

    let started = state
        .backend
        .with_token(identity.token)
        .start_ingest(request.dry_run)
        .await?;

    Ok(ApiResponse::accepted(started))
}

pub async fn cancel(State(state): State<AppState>, identity: Identity) -> ApiResult<Value> {
    tracing::info!(subject = %identity.subject, "cancelling ingest");
    let cancelled = state.backend.with_token(identity.token).cancel_ingest().await?;
    Ok(ApiResponse::success(cancelled))
}

/// GET /api/ingest/events - Relay the backend's event stream byte for byte.
/// The browser's EventSource handles reconnects and passes `since` back in.
pub async fn events(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<EventsQuery>,
) -> Result<Response, ApiError> {
    let upstream = state
        .backend
        .with_token(identity.token)
        .open_event_stream(query.since)
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}
