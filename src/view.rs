use metrics::counter;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Variant;
use crate::engine::Engine;
use crate::session::{SessionSnapshot, SessionStore, Theme};
use crate::types::{HistoryEntry, Message, Prediction};

pub const EMPTY_MESSAGE_WARNING: &str = "Please enter a message to classify.";
pub const HISTORY_CLEARED: &str = "Prediction history cleared.";

/// Result of the last user action, as shown on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Idle,
    Invalid,
    Scored(Prediction),
    Failed(String),
    HistoryCleared,
}

/// Everything needed to render one page for one session.
#[derive(Debug, Clone)]
pub struct Page {
    pub session_id: Uuid,
    pub variant: Variant,
    pub theme: Theme,
    pub message: String,
    pub outcome: Outcome,
    /// `None` when the variant has no history.
    pub history: Option<Vec<HistoryEntry>>,
}

/// Drives the submit/clear/theme actions for a session. The engine is shared
/// by every session; per-session state lives in the store.
#[derive(Clone)]
pub struct ClassificationView {
    engine: Arc<dyn Engine + Send + Sync>,
    sessions: Arc<SessionStore>,
    variant: Variant,
}

impl ClassificationView {
    pub fn new(
        engine: Arc<dyn Engine + Send + Sync>,
        sessions: Arc<SessionStore>,
        variant: Variant,
    ) -> Self {
        Self {
            engine,
            sessions,
            variant,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn engine(&self) -> &Arc<dyn Engine + Send + Sync> {
        &self.engine
    }

    #[tracing::instrument(skip(self, raw), fields(message_len = raw.len()))]
    pub async fn submit(&self, session_id: Uuid, raw: &str) -> Page {
        counter!("classification_requests_total").increment(1);

        let Some(message) = Message::new(raw) else {
            counter!("validation_rejections_total").increment(1);
            tracing::debug!("Blank message submitted");
            return self.page(session_id, raw.to_string(), Outcome::Invalid);
        };

        let outcome = match self.engine.classify(&message).await {
            Ok(prediction) => {
                counter!("predictions_total", "label" => prediction.label.as_str()).increment(1);
                if self.variant.history_enabled() {
                    let len = self
                        .sessions
                        .record(session_id, HistoryEntry::new(&message, &prediction));
                    tracing::debug!(history_len = len, "Prediction recorded");
                }
                tracing::info!(label = %prediction.label, "Message classified");
                Outcome::Scored(prediction)
            }
            Err(e) => {
                counter!("inference_failures_total").increment(1);
                tracing::error!(error = %e, "Classification failed");
                Outcome::Failed(e.to_string())
            }
        };

        self.page(session_id, message.as_str().to_string(), outcome)
    }

    pub fn clear_history(&self, session_id: Uuid) -> Page {
        self.sessions.clear_history(session_id);
        tracing::info!(%session_id, "History cleared");
        self.page(session_id, String::new(), Outcome::HistoryCleared)
    }

    pub fn set_theme(&self, session_id: Uuid, theme: Theme) {
        self.sessions.set_theme(session_id, theme);
    }

    pub fn idle(&self, session_id: Uuid) -> Page {
        self.page(session_id, String::new(), Outcome::Idle)
    }

    fn page(&self, session_id: Uuid, message: String, outcome: Outcome) -> Page {
        // The minimal variant keeps no per-session state.
        let snapshot = if self.variant.history_enabled() || self.variant.theme_enabled() {
            self.sessions.snapshot(session_id)
        } else {
            SessionSnapshot::default()
        };

        Page {
            session_id,
            variant: self.variant,
            theme: snapshot.theme,
            message,
            outcome,
            history: self.variant.history_enabled().then_some(snapshot.history),
        }
    }
}
