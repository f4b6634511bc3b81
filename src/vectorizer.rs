use anyhow::{Result, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    #[default]
    L2,
    None,
}

/// A fitted bag-of-words vectorizer. The vocabulary and weights come from the
/// training pipeline and are never modified here.
#[derive(Debug, Clone, Deserialize)]
pub struct Vectorizer {
    vocabulary: HashMap<String, usize>,
    #[serde(default)]
    idf: Option<Vec<f64>>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default)]
    norm: Norm,
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Sparse feature vector, sorted by feature index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizedMessage {
    pub dimension: usize,
    pub features: Vec<(usize, f64)>,
}

impl VectorizedMessage {
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.features
            .iter()
            .map(|&(index, value)| value * weights[index])
            .sum()
    }
}

impl Vectorizer {
    pub fn from_json(json: &str) -> Result<Self> {
        let vectorizer: Vectorizer = serde_json::from_str(json)?;
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn validate(&self) -> Result<()> {
        let dimension = self.dimension();
        if dimension == 0 {
            bail!("Vectorizer vocabulary is empty");
        }

        let mut seen = vec![false; dimension];
        for (term, &index) in &self.vocabulary {
            if index >= dimension || seen[index] {
                bail!("Vocabulary index {index} for term {term:?} is out of range or duplicated");
            }
            seen[index] = true;
        }

        if let Some(idf) = &self.idf {
            if idf.len() != dimension {
                bail!(
                    "IDF has {} weights but the vocabulary has {} terms",
                    idf.len(),
                    dimension
                );
            }
            if idf.iter().any(|w| !w.is_finite()) {
                bail!("IDF weights must be finite");
            }
        }

        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            bail!("Invalid ngram range ({min_n}, {max_n})");
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(dimension = self.dimension()))]
    pub fn transform(&self, text: &str) -> VectorizedMessage {
        let tokens = self.tokenize(text);

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.ngrams(&tokens) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut features: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                let weight = self.idf.as_ref().map_or(1.0, |idf| idf[index]);
                (index, tf * weight)
            })
            .collect();

        let norm = match self.norm {
            Norm::L1 => features.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            Norm::L2 => features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Norm::None => 1.0,
        };
        if norm > 0.0 {
            for (_, value) in &mut features {
                *value /= norm;
            }
        }

        tracing::trace!(tokens = tokens.len(), nonzero = features.len(), "Message vectorized");

        VectorizedMessage {
            dimension: self.dimension(),
            features,
        }
    }

    // Words are runs of two or more alphanumeric/underscore characters.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| token.chars().count() >= 2)
            .map(str::to_string)
            .collect()
    }

    fn ngrams(&self, tokens: &[String]) -> Vec<String> {
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer(extra: &str) -> Vectorizer {
        let json = format!(
            r#"{{"vocabulary": {{"free": 0, "prize": 1, "meet": 2, "free prize": 3}}{extra}}}"#
        );
        Vectorizer::from_json(&json).unwrap()
    }

    #[test]
    fn tokenizes_words_of_two_or_more_characters() {
        let v = vectorizer("");
        assert_eq!(
            v.tokenize("Let's meet at 5pm, a_b!"),
            vec!["let", "meet", "at", "5pm", "a_b"]
        );
    }

    #[test]
    fn counts_known_terms_and_ignores_unknown() {
        let v = vectorizer(r#", "norm": "none""#);
        let x = v.transform("FREE free prize for you");
        assert_eq!(x.dimension, 4);
        assert_eq!(x.features, vec![(0, 2.0), (1, 1.0)]);
    }

    #[test]
    fn l2_norm_gives_unit_length() {
        let v = vectorizer("");
        let x = v.transform("free free prize meet");
        let length: f64 = x.features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        assert!((length - 1.0).abs() < 1e-12);
    }

    #[test]
    fn applies_idf_and_sublinear_tf() {
        let v = vectorizer(
            r#", "idf": [2.0, 1.0, 1.0, 1.0], "sublinear_tf": true, "norm": "none""#,
        );
        let x = v.transform("free free prize");
        let expected_free = (1.0 + 2f64.ln()) * 2.0;
        assert!((x.features[0].1 - expected_free).abs() < 1e-12);
        assert_eq!(x.features[1], (1, 1.0));
    }

    #[test]
    fn bigrams_are_space_joined() {
        let v = vectorizer(r#", "ngram_range": [1, 2], "norm": "none""#);
        let x = v.transform("free prize");
        assert_eq!(x.features, vec![(0, 1.0), (1, 1.0), (3, 1.0)]);
    }

    #[test]
    fn unknown_text_yields_empty_vector() {
        let v = vectorizer("");
        let x = v.transform("nothing relevant here");
        assert!(x.features.is_empty());
        assert_eq!(x.dot(&[1.0, 1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn rejects_inconsistent_artifacts() {
        assert!(Vectorizer::from_json(r#"{"vocabulary": {}}"#).is_err());
        assert!(Vectorizer::from_json(r#"{"vocabulary": {"a": 0, "b": 0}}"#).is_err());
        assert!(Vectorizer::from_json(r#"{"vocabulary": {"a": 0, "b": 5}}"#).is_err());
        assert!(Vectorizer::from_json(r#"{"vocabulary": {"a": 0}, "idf": [1.0, 2.0]}"#).is_err());
        assert!(
            Vectorizer::from_json(r#"{"vocabulary": {"a": 0}, "ngram_range": [2, 1]}"#).is_err()
        );
        assert!(Vectorizer::from_json("not json").is_err());
    }
}
