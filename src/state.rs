use std::sync::Arc;
use crate::mailer::Mailer;
use crate::rate_limit::RateLimiter;
use crate::sessions::SessionRegistry;
use crate::upstream::UpstreamSessionClient;
// app's shared state, each component guards its own data

pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub sessions: Arc<SessionRegistry>, // shared with the sweeper task
    pub upstream: UpstreamSessionClient,
    pub mailer: Mailer,
}
