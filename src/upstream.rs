use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{RetryPolicy, UpstreamConfig};
use crate::error::{AttemptError, RelayError};
use crate::metrics::{SESSIONS_CREATED, UPSTREAM_ATTEMPTS, UPSTREAM_FAILURES};
use crate::models::UpstreamSessionRequest;
use crate::sessions::SessionRegistry;

/// One call to the session-creation API.
///
/// Implementations report every failure as an [`AttemptError`]; retrying is
/// left to [`UpstreamSessionClient`].
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn request_session(&self, api_key: &str) -> Result<Value, AttemptError>;
}

// reqwest backed implementation
pub struct HttpSessionApi {
    client: reqwest::Client,
    endpoint: String,
    body: UpstreamSessionRequest,
    timeout: Duration,
}

impl HttpSessionApi {
    pub fn new(client: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/realtime/sessions", config.api_base),
            body: UpstreamSessionRequest {
                model: config.model.clone(),
                voice: config.voice.clone(),
            },
            timeout: config.timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn request_session(&self, api_key: &str) -> Result<Value, AttemptError> {
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AttemptError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        res.json::<Value>()
            .await
            .map_err(|e| AttemptError::Decode(e.to_string()))
    }
}

// Pull the session id out of an upstream payload
pub fn session_id(payload: &Value) -> Option<&str> {
    payload
        .get("session_id")
        .or_else(|| payload.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

pub struct UpstreamSessionClient {
    api: Arc<dyn SessionApi>,
    api_key: Option<String>,
    policy: RetryPolicy,
    registry: Arc<SessionRegistry>,
}

impl UpstreamSessionClient {
    pub fn new(
        api: Arc<dyn SessionApi>,
        api_key: Option<String>,
        policy: RetryPolicy,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            api,
            api_key,
            policy,
            registry,
        }
    }

    /// Create an upstream session, retrying failed attempts with exponential backoff.
    ///
    /// A missing credential fails at once and is never retried. When a 2xx
    /// payload carries an id it is registered; a payload without one is still
    /// returned to the caller but not tracked.
    pub async fn create_session(&self) -> Result<Value, RelayError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("session requested but OPENAI_API_KEY is not set");
            return Err(RelayError::Configuration(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        };

        // zero retries still means one attempt
        let attempts = self.policy.max_retries.max(1);
        let mut last_error = AttemptError::Transport("no attempt made".to_string());

        for attempt in 0..attempts {
            UPSTREAM_ATTEMPTS.inc();
            match self.api.request_session(api_key).await {
                Ok(payload) => {
                    self.track(&payload);
                    tracing::info!(attempt = attempt + 1, "session created");
                    return Ok(payload);
                }
                Err(e) => {
                    UPSTREAM_FAILURES.inc();
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "session attempt failed"
                    );
                    last_error = e;
                }
            }

            if attempt + 1 < attempts {
                let delay = self.policy.backoff(attempt);
                tracing::debug!(?delay, "backing off before next attempt");
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(attempts, error = %last_error, "session creation exhausted retries");
        Err(RelayError::UpstreamExhausted {
            attempts,
            last_error,
        })
    }

    fn track(&self, payload: &Value) {
        match session_id(payload) {
            Some(id) => {
                self.registry.register(id, Instant::now());
                SESSIONS_CREATED.inc();
                tracing::debug!(
                    session_id = id,
                    active = self.registry.count(),
                    "session registered"
                );
            }
            None => {
                tracing::warn!("upstream payload has no session id, not tracking it");
            }
        }
    }
}
