use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::classifier::Classifier;
use crate::vectorizer::Vectorizer;

/// The fitted vectorizer/classifier pair, loaded once per process.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub vectorizer: Vectorizer,
    pub classifier: Classifier,
}

impl Artifacts {
    #[tracing::instrument(fields(vectorizer = %vectorizer_path.display(), classifier = %classifier_path.display()))]
    pub fn load(vectorizer_path: &Path, classifier_path: &Path) -> Result<Self> {
        let vectorizer_json = std::fs::read_to_string(vectorizer_path).with_context(|| {
            format!("Failed to read vectorizer from {}", vectorizer_path.display())
        })?;
        let classifier_json = std::fs::read_to_string(classifier_path).with_context(|| {
            format!("Failed to read classifier from {}", classifier_path.display())
        })?;

        Self::from_json(&vectorizer_json, &classifier_json)
    }

    pub fn from_json(vectorizer_json: &str, classifier_json: &str) -> Result<Self> {
        let vectorizer =
            Vectorizer::from_json(vectorizer_json).context("Invalid vectorizer artifact")?;
        let classifier =
            Classifier::from_json(classifier_json).context("Invalid classifier artifact")?;

        if vectorizer.dimension() != classifier.n_features() {
            bail!(
                "Vectorizer produces {} features but classifier expects {}",
                vectorizer.dimension(),
                classifier.n_features()
            );
        }

        tracing::debug!(
            dimension = vectorizer.dimension(),
            "Artifacts deserialized"
        );

        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    /// The artifacts shipped in `artifacts/`.
    #[cfg(test)]
    pub(crate) fn demo() -> Self {
        Self::from_json(
            include_str!("../artifacts/vectorizer.json"),
            include_str!("../artifacts/model.json"),
        )
        .expect("demo artifacts are valid")
    }
}
