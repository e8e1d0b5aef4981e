// JSON handlers: version, seed control, symbol registration, manual batch, audit

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::error::SeedError;
use crate::models::SettingsPatch;
use crate::seed::SeedRequest;

const DEFAULT_AUDIT_LIMIT: u32 = 50;
const MAX_AUDIT_LIMIT: u32 = 500;

/// Configuration errors are the caller's fault (400); anything else is a 500.
pub(super) struct ApiError(SeedError);

impl From<SeedError> for ApiError {
    fn from(e: SeedError) -> Self {
        ApiError(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError(SeedError::Store(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            SeedError::Configuration(_) => StatusCode::BAD_REQUEST,
            SeedError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "admin request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(super) async fn status_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.status().await?))
}

pub(super) async fn start_handler(
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = state.service.start_seed(&request).await?;
    Ok(Json(started))
}

#[derive(Debug, Deserialize)]
pub(super) struct AddSymbolsRequest {
    symbols: Vec<String>,
}

/// POST /api/seed/symbols: registers symbols and queues their tasks without restarting the run.
pub(super) async fn add_symbols_handler(
    State(state): State<AppState>,
    Json(request): Json<AddSymbolsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.add_symbols(&request.symbols).await?))
}

/// POST /api/seed/run: one invocation, same semantics as a trigger tick.
pub(super) async fn run_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.run_once().await?))
}

pub(super) async fn pause_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.service.pause().await?;
    Ok(Json(serde_json::json!({ "paused": true })))
}

pub(super) async fn resume_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.service.resume().await?;
    Ok(Json(serde_json::json!({ "paused": false })))
}

pub(super) async fn settings_handler(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.update_settings(&patch).await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct AuditQuery {
    limit: Option<u32>,
}

pub(super) async fn audit_handler(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    Ok(Json(state.store.recent_audit(limit).await?))
}
