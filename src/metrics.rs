use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("relay_requests_total", "Requests admitted by the rate limiter").unwrap();
    pub static ref THROTTLED_TOTAL: Counter =
        register_counter!("relay_throttled_total", "Requests rejected by the rate limiter")
            .unwrap();
    pub static ref UPSTREAM_ATTEMPTS: Counter =
        register_counter!("relay_upstream_attempts_total", "Session API attempts").unwrap();
    pub static ref UPSTREAM_FAILURES: Counter =
        register_counter!("relay_upstream_failures_total", "Failed session API attempts").unwrap();
    pub static ref SESSIONS_CREATED: Counter =
        register_counter!("relay_sessions_created_total", "Sessions registered").unwrap();
    pub static ref SESSIONS_EXPIRED: Counter =
        register_counter!("relay_sessions_expired_total", "Sessions removed by the sweeper")
            .unwrap();
    pub static ref ACTIVE_SESSIONS: Gauge =
        register_gauge!("relay_active_sessions", "Sessions currently tracked").unwrap();
    pub static ref SESSION_LATENCY: Histogram = register_histogram!(
        "relay_session_latency_seconds",
        "Session creation latency in seconds, retries included"
    )
    .unwrap();
    pub static ref EMAILS_SENT: Counter =
        register_counter!("relay_emails_sent_total", "Emails delivered").unwrap();
    pub static ref EMAILS_FAILED: Counter =
        register_counter!("relay_emails_failed_total", "Emails that failed to deliver").unwrap();
}

// Register everything up front so /metrics lists zeroed series before first use
pub fn init() {
    lazy_static::initialize(&REQUEST_TOTAL);
    lazy_static::initialize(&THROTTLED_TOTAL);
    lazy_static::initialize(&UPSTREAM_ATTEMPTS);
    lazy_static::initialize(&UPSTREAM_FAILURES);
    lazy_static::initialize(&SESSIONS_CREATED);
    lazy_static::initialize(&SESSIONS_EXPIRED);
    lazy_static::initialize(&ACTIVE_SESSIONS);
    lazy_static::initialize(&SESSION_LATENCY);
    lazy_static::initialize(&EMAILS_SENT);
    lazy_static::initialize(&EMAILS_FAILED);
}

// Render the default registry in the text exposition format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
