//! Trained text model
//!
//! A multinomial naive Bayes classifier over lower-cased word tokens. The
//! pipeline only depends on [`TextModel`]; the concrete model is persisted as
//! JSON at the configured model path and swapped in via
//! [`super::Classifier::reload`] after retraining.

use crate::error::{Result, SortError};
use crate::models::TrainingSample;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Label and certainty for one piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Raw label; may fall outside the known category set after retraining
    pub label: String,
    /// Highest class probability
    pub confidence: f32,
}

/// Why a model declined to predict
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("text has no usable tokens")]
    NoFeatures,

    #[error("none of the tokens appear in the model vocabulary")]
    UnknownVocabulary,

    #[error("model is inconsistent: {0}")]
    Corrupt(String),
}

/// A trained artifact able to label text
pub trait TextModel: Send + Sync {
    fn predict(&self, text: &str) -> std::result::Result<Prediction, ModelError>;
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
        "been", "before", "but", "by", "can", "do", "does", "for", "from", "had", "has", "have",
        "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "me", "my", "no", "not",
        "of", "on", "or", "our", "she", "so", "than", "that", "the", "their", "them", "then",
        "there", "these", "they", "this", "to", "up", "us", "was", "we", "were", "what", "when",
        "which", "who", "will", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Lower-cased alphanumeric tokens of two or more characters, stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    label: String,
    log_prior: f64,
    token_counts: HashMap<String, u32>,
    total_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    classes: Vec<ClassStats>,
    vocabulary: HashSet<String>,
    sample_count: usize,
}

impl NaiveBayesModel {
    /// Fit on labelled samples. Needs at least two distinct labels.
    pub fn fit(samples: &[TrainingSample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(SortError::Training("no training samples".to_string()));
        }

        let mut per_label: HashMap<&str, (usize, HashMap<String, u32>, u64)> = HashMap::new();
        let mut vocabulary = HashSet::new();

        for sample in samples {
            let entry = per_label
                .entry(sample.label.as_str())
                .or_insert_with(|| (0, HashMap::new(), 0));
            entry.0 += 1;
            for token in tokenize(&sample.text) {
                *entry.1.entry(token.clone()).or_insert(0) += 1;
                entry.2 += 1;
                vocabulary.insert(token);
            }
        }

        if per_label.len() < 2 {
            return Err(SortError::Training(format!(
                "need at least two labels, got {}",
                per_label.len()
            )));
        }
        if vocabulary.is_empty() {
            return Err(SortError::Training(
                "samples contain no usable tokens".to_string(),
            ));
        }

        let total = samples.len() as f64;
        let mut classes: Vec<ClassStats> = per_label
            .into_iter()
            .map(|(label, (docs, token_counts, total_tokens))| ClassStats {
                label: label.to_string(),
                log_prior: (docs as f64 / total).ln(),
                token_counts,
                total_tokens,
            })
            .collect();
        // Stable order keeps ties and serialized output deterministic
        classes.sort_by(|a, b| a.label.cmp(&b.label));

        Ok(Self {
            classes,
            vocabulary,
            sample_count: samples.len(),
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.label.as_str())
    }

    /// Load a persisted model; `Ok(None)` when no artifact exists yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SortError::io(
                    format!("cannot read model {}", path.display()),
                    e,
                ))
            }
        };
        let model = serde_json::from_slice(&bytes).map_err(|source| SortError::ModelFormat {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(model))
    }

    /// Persist next to `path` and rename into place
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SortError::io(format!("cannot create {}", parent.display()), e))?;
        }
        let json = serde_json::to_vec(self).map_err(|source| SortError::ModelFormat {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| SortError::io(format!("cannot write {}", tmp.display()), e))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| SortError::io(format!("cannot replace {}", path.display()), e))?;
        Ok(())
    }
}

impl TextModel for NaiveBayesModel {
    fn predict(&self, text: &str) -> std::result::Result<Prediction, ModelError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(ModelError::NoFeatures);
        }
        let known: Vec<&String> = tokens
            .iter()
            .filter(|t| self.vocabulary.contains(t.as_str()))
            .collect();
        if known.is_empty() {
            return Err(ModelError::UnknownVocabulary);
        }
        if self.classes.is_empty() {
            return Err(ModelError::Corrupt("no classes".to_string()));
        }

        let vocab = self.vocabulary.len() as f64;
        let scores: Vec<f64> = self
            .classes
            .iter()
            .map(|class| {
                let denom = class.total_tokens as f64 + vocab;
                known.iter().fold(class.log_prior, |acc, token| {
                    let count = class.token_counts.get(token.as_str()).copied().unwrap_or(0);
                    acc + ((count as f64 + 1.0) / denom).ln()
                })
            })
            .collect();

        // Softmax via log-sum-exp
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(ModelError::Corrupt("non-finite class score".to_string()));
        }
        let norm: f64 = scores.iter().map(|s| (s - max).exp()).sum();

        let (best, best_score) = scores
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bs), (i, &s)| {
                if s > bs {
                    (i, s)
                } else {
                    (bi, bs)
                }
            });

        Ok(Prediction {
            label: self.classes[best].label.clone(),
            confidence: ((best_score - max).exp() / norm) as f32,
        })
    }
}
