use axum::{Json, extract::State};
use std::sync::Arc;
use tokio::time::Instant;
use crate::models::{HealthResponse, RateLimitSnapshot};
use crate::state::AppState;

// health handler - read-only snapshot, never throttled
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let limits = state.rate_limiter.config();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        active_sessions: state.sessions.count(),
        rate_limit: RateLimitSnapshot {
            current_requests: state.rate_limiter.current(Instant::now()),
            max_requests: limits.max_requests,
            window_seconds: limits.window.as_secs(),
        },
    })
}
