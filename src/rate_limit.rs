use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::RateLimitConfig;
use crate::error::RelayError;
use crate::metrics::THROTTLED_TOTAL;
use crate::state::AppState;

// Process-wide sliding window limiter
#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<VecDeque<Instant>>, // oldest first
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            window: Mutex::new(VecDeque::with_capacity(config.max_requests)),
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Admit or reject a request arriving at `now`.
    ///
    /// Timestamps with `now - t >= window` are dropped first. A rejected call
    /// is not recorded, so it does not push the window further out.
    pub fn admit(&self, now: Instant) -> bool {
        let mut window = self.window.lock();
        prune(&mut window, now, self.config.window);

        if window.len() >= self.config.max_requests {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Requests counted inside the window at `now`.
    pub fn current(&self, now: Instant) -> usize {
        let window = self.window.lock();
        window
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < self.config.window)
            .count()
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, span: std::time::Duration) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}

// Middleware guarding the throttled routes
pub async fn throttle(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    if !state.rate_limiter.admit(Instant::now()) {
        THROTTLED_TOTAL.inc();
        tracing::warn!(
            path = %request.uri().path(),
            max_requests = state.rate_limiter.config.max_requests,
            "request throttled"
        );
        return Err(RelayError::Throttled);
    }
    Ok(next.run(request).await)
}
