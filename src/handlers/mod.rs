mod email;
mod health;
mod metrics;
mod session;

pub use email::{send_email_handler, send_email_sync_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use session::session_handler;
