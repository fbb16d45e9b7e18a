//! Training sample accumulation and retraining
//!
//! Samples live for the process lifetime and are never pruned. Retraining
//! fits a fresh model over all of them, persists it at the model path and
//! swaps it into the classifier.

use crate::error::{Result, SortError};
use crate::models::{Category, TrainingSample};
use crate::services::classifier::{Classifier, NaiveBayesModel};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Baseline corpus the store starts with
const BASELINE: &[(&str, Category)] = &[
    ("invoice for october payment", Category::Invoices),
    ("attached is our bill for services", Category::Invoices),
    ("payment due for invoice 992A", Category::Invoices),
    ("receipt for new laptop", Category::Invoices),
    ("quarterly performance report", Category::Reports),
    ("annual summary sales report", Category::Reports),
    ("end of year business report", Category::Reports),
    ("company update newsletter", Category::Reports),
    ("john doe resume software engineer", Category::Resumes),
    ("jane smith cv marketing", Category::Resumes),
    ("application for project manager role", Category::Resumes),
    ("attached is my resume", Category::Resumes),
    ("candidate profile: senior developer", Category::Resumes),
    ("family photo vacation", Category::Photos),
    ("team picture at retreat", Category::Photos),
    ("holiday trip photos", Category::Photos),
    ("random text note", Category::Others),
    ("meeting minutes", Category::Others),
    ("project proposal draft", Category::Others),
    ("shopping list groceries", Category::Others),
];

#[derive(Debug)]
pub struct TrainingStore {
    samples: Mutex<Vec<TrainingSample>>,
}

impl TrainingStore {
    pub fn empty() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
        }
    }

    /// Store seeded with the baseline corpus
    pub fn with_baseline() -> Self {
        let store = Self::empty();
        store.append(
            BASELINE
                .iter()
                .map(|(text, label)| TrainingSample::new(*text, label.as_str()))
                .collect(),
        );
        store
    }

    /// Add samples; returns the new total
    pub fn append(&self, new: Vec<TrainingSample>) -> usize {
        let mut samples = self.samples.lock().unwrap_or_else(|p| p.into_inner());
        samples.extend(new);
        samples.len()
    }

    pub fn samples(&self) -> Vec<TrainingSample> {
        self.samples
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reject samples whose label is not a known category
pub fn validate_samples(samples: &[TrainingSample]) -> Result<()> {
    for sample in samples {
        if Category::parse(&sample.label).is_none() {
            return Err(unknown_label(sample));
        }
    }
    Ok(())
}

/// Rewrite each label to its category's canonical spelling so "invoices"
/// and "Invoices" train the same class
pub fn canonicalize_samples(samples: Vec<TrainingSample>) -> Result<Vec<TrainingSample>> {
    samples
        .into_iter()
        .map(|sample| match Category::parse(&sample.label) {
            Some(category) => Ok(TrainingSample::new(sample.text, category.as_str())),
            None => Err(unknown_label(&sample)),
        })
        .collect()
}

fn unknown_label(sample: &TrainingSample) -> SortError {
    SortError::Training(format!(
        "unknown label '{}' for sample '{}'",
        sample.label, sample.text
    ))
}

/// Fits, persists and hot-swaps the classifier's model
pub struct Trainer {
    store: Arc<TrainingStore>,
    classifier: Arc<Classifier>,
    model_path: PathBuf,
    // Serializes retrains so two fits never race on the artifact
    lock: Mutex<()>,
}

impl Trainer {
    pub fn new(store: Arc<TrainingStore>, classifier: Arc<Classifier>, model_path: PathBuf) -> Self {
        Self {
            store,
            classifier,
            model_path,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<TrainingStore> {
        &self.store
    }

    /// Append validated samples and retrain. Blocking; call off the async loop.
    /// Returns the total sample count the new model was fit on.
    pub fn append_and_retrain(&self, samples: Vec<TrainingSample>) -> Result<usize> {
        let samples = canonicalize_samples(samples)?;
        self.store.append(samples);
        self.retrain()
    }

    pub fn retrain(&self) -> Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let samples = self.store.samples();

        let model = NaiveBayesModel::fit(&samples)?;
        model.save(&self.model_path)?;
        self.classifier.reload(Some(Arc::new(model)));

        tracing::info!(
            "[Trainer] Model trained with {} samples and saved at {}",
            samples.len(),
            self.model_path.display()
        );
        Ok(samples.len())
    }
}
