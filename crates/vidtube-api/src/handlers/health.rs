//! Liveness probe.

use axum::extract::State;
use chrono::Utc;
use serde_json::{Value, json};
use vidtube_core::store::DocumentStore;

use crate::{ApiError, ApiResponse, AppState, Result};

/// `GET /healthcheck`
///
/// Fails with 500 unless the store answers a ping.
pub async fn check<S>(State(state): State<AppState<S>>) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  state.store.ping().await.map_err(ApiError::internal)?;
  let data = json!({
    "status":    "OK",
    "message":   "Server is healthy",
    "timestamp": Utc::now(),
    "uptime":    state.started_at.elapsed().as_secs_f64(),
    "version":   env!("CARGO_PKG_VERSION"),
  });
  Ok(ApiResponse::ok(data, "Health check passed"))
}
