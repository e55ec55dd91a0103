use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::DeliveryError;

// Body sent to the realtime sessions endpoint
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpstreamSessionRequest {
    pub model: String,
    pub voice: String,
}

// Incoming email request
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduledResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailSentResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub current_requests: usize,
    pub max_requests: usize,
    pub window_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub active_sessions: usize,
    pub rate_limit: RateLimitSnapshot,
}

// Queued mail - holds the message + optional channel for the outcome
pub struct MailJob {
    pub email: EmailRequest,
    pub reply_tx: Option<oneshot::Sender<Result<(), DeliveryError>>>, // None for fire-and-forget
}
