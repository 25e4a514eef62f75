//! Spoof control handlers
//!
//! Engine calls may block on OS commands or gpsd, so they run on the
//! blocking pool.

use axum::{body::Bytes, extract::State, Json};

use crate::{AppState, AppResult};
use crate::models::{ControlCommand, ControlResponse, StatusSnapshot};

/// Current spoof, detected candidates and GPS
pub async fn status(State(state): State<AppState>) -> AppResult<Json<StatusSnapshot>> {
    let engine = state.engine.clone();
    let snapshot = tokio::task::spawn_blocking(move || engine.snapshot()).await?;
    Ok(Json(snapshot))
}

/// `{"action": "revert"}` or `{"action": "spoof", "type": ..., "name": ...}`
pub async fn control(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<ControlResponse>> {
    let command = ControlCommand::parse(&body).map_err(|e| {
        tracing::warn!("Rejected control request: {}", e);
        e
    })?;

    let engine = state.engine.clone();
    match command {
        ControlCommand::Revert => {
            tracing::info!("Manual revert requested");
            tokio::task::spawn_blocking(move || engine.manual_revert()).await??;
        }
        ControlCommand::Spoof(record) => {
            tracing::info!(identity = %record, "Manual spoof requested");
            tokio::task::spawn_blocking(move || engine.manual_spoof(record)).await??;
        }
    }

    Ok(Json(ControlResponse::success()))
}
