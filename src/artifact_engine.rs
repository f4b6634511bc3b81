use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::artifacts::Artifacts;
use crate::engine::Engine;
use crate::types::{Message, Prediction};

/// Scores messages with the process-wide artifacts. Cloning shares the same
/// artifacts; nothing here mutates them.
#[derive(Debug, Clone)]
pub struct ArtifactEngine {
    artifacts: Arc<Artifacts>,
}

impl ArtifactEngine {
    pub fn new(artifacts: Arc<Artifacts>) -> Self {
        Self { artifacts }
    }
}

#[async_trait]
impl Engine for ArtifactEngine {
    #[tracing::instrument(skip_all, fields(message_len = message.as_str().len()))]
    async fn classify(&self, message: &Message) -> Result<Prediction> {
        let features = self.artifacts.vectorizer.transform(message.as_str());
        let probs = self.artifacts.classifier.predict_proba(&features)?;
        let prediction = Prediction::from_probabilities(probs.spam, probs.ham);

        tracing::debug!(
            label = %prediction.label,
            spam_probability = prediction.spam_probability,
            "Message scored"
        );
        Ok(prediction)
    }
}
