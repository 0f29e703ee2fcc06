//! GET /health: store ping plus LLM endpoint probes.

use std::sync::Arc;

use ai_llm_service::HealthStatus;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Store reachable and every probed model healthy.
    pub ok: bool,
    pub store_ok: bool,
    pub llm: Vec<HealthStatus>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_ok = match state.engine.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "document store ping failed");
            false
        }
    };

    let llm = match &state.llm {
        Some(profiles) => profiles.health_all().await,
        None => Vec::new(),
    };

    let ok = store_ok && llm.iter().all(|s| s.ok);
    Json(HealthResponse { ok, store_ok, llm })
}
