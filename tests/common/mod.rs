#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use realtime_relay::config::{RateLimitConfig, RetryPolicy};
use realtime_relay::mailer::{MailTransport, UnconfiguredTransport};
use realtime_relay::rate_limit::RateLimiter;
use realtime_relay::sessions::SessionRegistry;
use realtime_relay::upstream::{SessionApi, UpstreamSessionClient};
use realtime_relay::worker::spawn_mail_worker;
use realtime_relay::{AppState, AttemptError, create_router};

pub const API_KEY: &str = "sk-test";

// Always succeeds, handing out ids sess_1, sess_2, ...
#[derive(Default)]
pub struct CountingApi {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SessionApi for CountingApi {
    async fn request_session(&self, _api_key: &str) -> Result<Value, AttemptError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "session_id": format!("sess_{n}") }))
    }
}

pub struct Harness {
    pub app: Router,
    pub state: Arc<AppState>,
}

pub struct HarnessBuilder {
    api: Arc<dyn SessionApi>,
    api_key: Option<String>,
    transport: Arc<dyn MailTransport>,
    rate_limit: RateLimitConfig,
    retry: RetryPolicy,
    static_dir: Option<std::path::PathBuf>,
}

impl HarnessBuilder {
    pub fn new(api: Arc<dyn SessionApi>) -> Self {
        Self {
            api,
            api_key: Some(API_KEY.to_string()),
            transport: Arc::new(UnconfiguredTransport),
            rate_limit: RateLimitConfig::default(),
            retry: RetryPolicy {
                max_retries: 3,
                retry_delay: Duration::from_millis(10),
            },
            static_dir: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    pub fn max_requests(mut self, max_requests: usize) -> Self {
        self.rate_limit.max_requests = max_requests;
        self
    }

    pub fn static_dir(mut self, dir: &std::path::Path) -> Self {
        self.static_dir = Some(dir.to_path_buf());
        self
    }

    pub fn build(self) -> Harness {
        let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(300)));
        let state = Arc::new(AppState {
            rate_limiter: RateLimiter::new(self.rate_limit),
            sessions: Arc::clone(&sessions),
            upstream: UpstreamSessionClient::new(self.api, self.api_key, self.retry, sessions),
            mailer: spawn_mail_worker(self.transport),
        });
        let app = create_router(Arc::clone(&state), self.static_dir.as_deref());
        Harness { app, state }
    }
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(res: Response<Body>) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(res: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

pub fn email_body() -> Value {
    json!({
        "to": "owner@example.com",
        "subject": "New message from Alex",
        "body": "Please call back about the order."
    })
}

// Serve `router` on an ephemeral port and return its base url
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
