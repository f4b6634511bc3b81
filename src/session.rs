use metrics::gauge;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::types::HistoryEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug)]
struct Session {
    history: Vec<HistoryEntry>,
    theme: Theme,
    last_seen: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            history: Vec::new(),
            theme: Theme::default(),
            last_seen: now,
        }
    }
}

/// What the page renderer needs from a session, copied out under one lock.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub theme: Theme,
    pub history: Vec<HistoryEntry>,
}

/// Per-session state keyed by session id. Sessions are created by the first
/// write (a recorded prediction or a theme change); reads never create one.
/// They are dropped when ended explicitly or after `ttl` without activity.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> R {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(id).or_insert_with(|| {
            tracing::debug!(session_id = %id, "Session started");
            Session::new(now)
        });
        session.last_seen = now;
        let result = f(session);
        gauge!("active_sessions").set(sessions.len() as f64);
        result
    }

    fn with_existing<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id)?;
        session.last_seen = Instant::now();
        Some(f(session))
    }

    /// Appends to the session's history, oldest first.
    pub fn record(&self, id: Uuid, entry: HistoryEntry) -> usize {
        self.with_session(id, |session| {
            session.history.push(entry);
            session.history.len()
        })
    }

    /// `None` when the session does not exist.
    pub fn history(&self, id: Uuid) -> Option<Vec<HistoryEntry>> {
        self.with_existing(id, |session| session.history.clone())
    }

    pub fn clear_history(&self, id: Uuid) {
        self.with_existing(id, |session| session.history.clear());
    }

    pub fn set_theme(&self, id: Uuid, theme: Theme) {
        self.with_session(id, |session| session.theme = theme);
    }

    /// Defaults for an unknown session.
    pub fn snapshot(&self, id: Uuid) -> SessionSnapshot {
        self.with_existing(id, |session| SessionSnapshot {
            theme: session.theme,
            history: session.history.clone(),
        })
        .unwrap_or_default()
    }

    /// Ends a session, discarding its history. Returns whether it existed.
    pub fn end(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.lock();
        let existed = sessions.remove(&id).is_some();
        gauge!("active_sessions").set(sessions.len() as f64);
        existed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| now.saturating_duration_since(session.last_seen) < self.ttl);
        gauge!("active_sessions").set(sessions.len() as f64);
        before - sessions.len()
    }
}

/// Background task that periodically drops idle sessions.
pub struct SessionSweeper {
    store: Arc<SessionStore>,
    config: SessionConfig,
}

impl SessionSweeper {
    pub fn new(store: Arc<SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    #[tracing::instrument(skip(self), fields(ttl = ?self.config.ttl))]
    pub async fn run_forever(self) {
        let mut tick_timer = interval(self.config.sweep_interval);

        loop {
            tick_timer.tick().await;
            let expired = self.store.sweep_expired();
            if expired > 0 {
                tracing::info!(expired, remaining = self.store.len(), "Expired idle sessions");
            } else {
                tracing::trace!("Sweep found no idle sessions");
            }
        }
    }
}
