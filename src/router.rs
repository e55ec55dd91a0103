use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::throttle;
use crate::state::AppState;

/// Build the HTTP router.
///
/// Session creation and both email routes share the global rate limiter;
/// health and metrics are never throttled. With `static_dir` set, any other
/// path is served from that directory (`/` maps to `index.html`).
pub fn create_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let throttled = Router::new()
        .route("/session", post(handlers::session_handler))
        .route("/send-email", post(handlers::send_email_handler))
        .route("/send-email/sync", post(handlers::send_email_sync_handler))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), throttle));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let mut app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .merge(throttled);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
