pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod sessions;
pub mod state;
pub mod upstream;
pub mod worker;

pub use config::Args;
pub use error::{AttemptError, DeliveryError, RelayError};
pub use router::create_router;
pub use state::AppState;
