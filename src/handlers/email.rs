use axum::{Json, extract::State};
use std::sync::Arc;
use crate::error::RelayError;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{EmailRequest, EmailSentResponse, ScheduledResponse};
use crate::state::AppState;

// Queue the email and answer before it is delivered
pub async fn send_email_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<ScheduledResponse>, RelayError> {
    REQUEST_TOTAL.inc();
    tracing::info!(to = %payload.to, "scheduling email notification");

    state.mailer.schedule(payload)?;

    Ok(Json(ScheduledResponse {
        message: "scheduled".to_string(),
    }))
}

// Wait for the SMTP outcome, delivery errors become a 500
pub async fn send_email_sync_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<EmailSentResponse>, RelayError> {
    REQUEST_TOTAL.inc();
    tracing::info!(to = %payload.to, "sending email notification");

    state.mailer.send(payload).await?;

    Ok(Json(EmailSentResponse {
        status: "success".to_string(),
        message: "Email sent successfully".to_string(),
    }))
}
