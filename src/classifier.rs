use anyhow::{Result, bail};
use serde::Deserialize;

use crate::types::Label;
use crate::vectorizer::VectorizedMessage;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    MultinomialNb {
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    },
    /// Binary model; the positive class is `classes[1]`.
    LogisticRegression { coef: Vec<f64>, intercept: f64 },
}

/// A fitted two-class text classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct Classifier {
    classes: Vec<Label>,
    #[serde(flatten)]
    model: Model,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub spam: f64,
    pub ham: f64,
}

impl Classifier {
    pub fn from_json(json: &str) -> Result<Self> {
        let classifier: Classifier = serde_json::from_str(json)?;
        classifier.validate()?;
        Ok(classifier)
    }

    pub fn n_features(&self) -> usize {
        match &self.model {
            Model::MultinomialNb {
                feature_log_prob, ..
            } => feature_log_prob.first().map_or(0, Vec::len),
            Model::LogisticRegression { coef, .. } => coef.len(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.classes.len() != 2
            || !self.classes.contains(&Label::Ham)
            || !self.classes.contains(&Label::Spam)
        {
            bail!(
                "Classifier classes must be exactly [ham, spam], got {:?}",
                self.classes
            );
        }

        match &self.model {
            Model::MultinomialNb {
                class_log_prior,
                feature_log_prob,
            } => {
                if class_log_prior.len() != 2 || feature_log_prob.len() != 2 {
                    bail!("Naive Bayes weights must have one row per class");
                }
                if feature_log_prob[0].len() != feature_log_prob[1].len() {
                    bail!("Naive Bayes feature rows differ in length");
                }
                let all_finite = class_log_prior
                    .iter()
                    .chain(feature_log_prob.iter().flatten())
                    .all(|w| w.is_finite());
                if !all_finite {
                    bail!("Naive Bayes weights must be finite");
                }
            }
            Model::LogisticRegression { coef, intercept } => {
                if !intercept.is_finite() || coef.iter().any(|w| !w.is_finite()) {
                    bail!("Logistic regression weights must be finite");
                }
            }
        }

        if self.n_features() == 0 {
            bail!("Classifier has no features");
        }

        Ok(())
    }

    pub fn predict_proba(&self, x: &VectorizedMessage) -> Result<ClassProbabilities> {
        if x.dimension != self.n_features() {
            bail!(
                "Feature dimension {} does not match classifier dimension {}",
                x.dimension,
                self.n_features()
            );
        }

        let probs = match &self.model {
            Model::MultinomialNb {
                class_log_prior,
                feature_log_prob,
            } => {
                let jll: Vec<f64> = class_log_prior
                    .iter()
                    .zip(feature_log_prob)
                    .map(|(prior, row)| prior + x.dot(row))
                    .collect();
                softmax(&jll)
            }
            Model::LogisticRegression { coef, intercept } => {
                let positive = sigmoid(x.dot(coef) + intercept);
                vec![1.0 - positive, positive]
            }
        };

        if probs.iter().any(|p| !p.is_finite()) {
            bail!("Classifier produced non-finite probabilities: {probs:?}");
        }

        let mut result = ClassProbabilities {
            spam: 0.0,
            ham: 0.0,
        };
        for (label, p) in self.classes.iter().zip(probs) {
            match label {
                Label::Spam => result.spam = p,
                Label::Ham => result.ham = p,
            }
        }
        Ok(result)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
