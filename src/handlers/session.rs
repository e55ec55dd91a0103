use axum::{Json, extract::State};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use crate::error::RelayError;
use crate::state::AppState;
use crate::metrics::{REQUEST_TOTAL, SESSION_LATENCY};

pub async fn session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, RelayError> {
    REQUEST_TOTAL.inc();
    tracing::info!("creating new realtime session");

    let start_time = Instant::now();
    let result = state.upstream.create_session().await;
    SESSION_LATENCY.observe(start_time.elapsed().as_secs_f64());

    result.map(Json)
}
