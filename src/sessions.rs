use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};

use crate::config::SessionConfig;
use crate::metrics::{ACTIVE_SESSIONS, SESSIONS_EXPIRED};

// Bookkeeping for one upstream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRecord {
    pub created_at: Instant,
    pub last_active: Instant, // only set on creation, nothing refreshes it yet
}

/// In-memory map of live upstream sessions.
///
/// The upstream client is the only writer and the sweeper the only deleter.
/// Nothing is persisted, so a restart forgets every session.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionRecord>,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // Overwrites silently if the id is already tracked
    pub fn register(&self, id: impl Into<String>, now: Instant) {
        self.sessions.insert(
            id.into(),
            SessionRecord {
                created_at: now,
                last_active: now,
            },
        );
        ACTIVE_SESSIONS.set(self.sessions.len() as f64);
    }

    /// Drop every record idle for longer than the timeout. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, record| now.saturating_duration_since(record.last_active) <= self.timeout);
        let remaining = self.sessions.len();
        ACTIVE_SESSIONS.set(remaining as f64);

        let removed = before.saturating_sub(remaining);
        SESSIONS_EXPIRED.inc_by(removed as f64);
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.get(id).map(|r| *r)
    }
}

// Sweep loop - runs every `sweep_interval` until the process stops
pub async fn run_sweeper(registry: Arc<SessionRegistry>, sweep_interval: Duration) {
    let mut ticker = interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let removed = registry.sweep(Instant::now());
        if removed > 0 {
            tracing::info!(
                removed,
                active = registry.count(),
                "expired sessions swept"
            );
        } else {
            tracing::debug!(active = registry.count(), "sweep pass finished");
        }
    }
}

/// Start the sweeper under a supervisor that restarts it if a pass panics.
pub fn spawn_sweeper(registry: Arc<SessionRegistry>, config: SessionConfig) -> JoinHandle<()> {
    tracing::info!(
        interval = ?config.sweep_interval,
        timeout = ?config.timeout,
        "session sweeper started"
    );
    tokio::spawn(supervise("session sweeper", move || {
        run_sweeper(Arc::clone(&registry), config.sweep_interval)
    }))
}

// Keep a background loop alive: a panic is logged and the loop is started again
pub(crate) async fn supervise<F, Fut>(name: &'static str, mut make_task: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    loop {
        match tokio::spawn(make_task()).await {
            Ok(()) => {
                tracing::warn!(task = name, "background task exited");
                return;
            }
            Err(e) if e.is_panic() => {
                tracing::error!(task = name, error = %e, "background task panicked, restarting");
            }
            Err(e) => {
                tracing::warn!(task = name, error = %e, "background task cancelled");
                return;
            }
        }
    }
}
