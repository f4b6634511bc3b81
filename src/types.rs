use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Ham => "ham",
            Label::Spam => "spam",
        }
    }

    /// Upper-cased form shown in the history table.
    pub fn display_name(&self) -> &'static str {
        match self {
            Label::Ham => "HAM",
            Label::Spam => "SPAM",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text that is safe to classify: never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(String);

impl Message {
    /// Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    pub spam_probability: f64,
    pub ham_probability: f64,
}

impl Prediction {
    /// Builds a prediction from class probabilities in `[0, 1]`. The label is
    /// the more probable class, ham on a tie.
    pub fn from_probabilities(spam: f64, ham: f64) -> Self {
        let label = if spam > ham { Label::Spam } else { Label::Ham };
        Self {
            label,
            spam_probability: round2(spam * 100.0),
            ham_probability: round2(ham * 100.0),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub message: String,
    pub label: String,
    pub spam_probability: f64,
    pub ham_probability: f64,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(message: &Message, prediction: &Prediction) -> Self {
        Self {
            message: message.as_str().to_string(),
            label: prediction.label.display_name().to_string(),
            spam_probability: prediction.spam_probability,
            ham_probability: prediction.ham_probability,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationRequest {
    pub input: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassificationResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub data: Vec<ClassificationData>,
}

#[derive(Debug, Serialize)]
pub struct ClassificationData {
    pub index: usize,
    pub label: Label,
    pub spam_probability: f64,
    pub ham_probability: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub entries: Vec<HistoryEntry>,
}
