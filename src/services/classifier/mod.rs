//! File classifier
//!
//! Decides a category and confidence for one file:
//! - images get a fixed `Photos` verdict without reading content
//! - text documents go through the trained model when one is loaded and the
//!   extracted text is non-blank, otherwise through keyword rules
//! - anything else is skipped
//!
//! The model slot can be swapped at any time with [`Classifier::reload`].
//! A classification clones the current `Arc` up front, so it finishes with
//! whichever model it started with.

mod model;
mod rules;

pub use model::{tokenize, ModelError, NaiveBayesModel, Prediction, TextModel};
pub use rules::rule_based;

use crate::config::Settings;
use crate::models::{Category, FileKind};
use crate::services::extractor::ContentExtractor;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Policy confidence for extension-based image classification
pub const IMAGE_CONFIDENCE: f32 = 0.90;

/// Which path produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Image,
    Rules,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Categorized {
        category: Category,
        confidence: f32,
        source: DecisionSource,
    },
    /// Unrecognized extension; no suggestion must be produced
    Skipped,
}

pub struct Classifier {
    settings: Arc<Settings>,
    extractor: Arc<dyn ContentExtractor>,
    model: RwLock<Option<Arc<dyn TextModel>>>,
}

impl Classifier {
    pub fn new(settings: Arc<Settings>, extractor: Arc<dyn ContentExtractor>) -> Self {
        Self {
            settings,
            extractor,
            model: RwLock::new(None),
        }
    }

    pub fn with_model(self, model: Option<Arc<dyn TextModel>>) -> Self {
        self.reload(model);
        self
    }

    pub fn classify(&self, path: &Path) -> Classification {
        match self.settings.kind_of(path) {
            Some(FileKind::Image) => Classification::Categorized {
                category: Category::Photos,
                confidence: IMAGE_CONFIDENCE,
                source: DecisionSource::Image,
            },
            Some(FileKind::Text) => {
                let text = self.extractor.extract(path);
                let (category, confidence, source) = self.classify_text(&text);
                Classification::Categorized {
                    category,
                    confidence,
                    source,
                }
            }
            None => Classification::Skipped,
        }
    }

    /// Model first, rules when the text is blank, no model is loaded, or
    /// the model declines
    pub fn classify_text(&self, text: &str) -> (Category, f32, DecisionSource) {
        if text.trim().is_empty() {
            let (category, confidence) = rule_based(text);
            return (category, confidence, DecisionSource::Rules);
        }

        if let Some(model) = self.current_model() {
            match model.predict(text) {
                Ok(prediction) => {
                    return (
                        Category::from_label(&prediction.label),
                        crate::models::clamp_confidence(prediction.confidence),
                        DecisionSource::Model,
                    );
                }
                Err(e) => {
                    tracing::debug!("[Classifier] Model declined, using rules: {}", e);
                }
            }
        }

        let (category, confidence) = rule_based(text);
        (category, confidence, DecisionSource::Rules)
    }

    /// Replace the active model. In-flight classifications keep the old one.
    pub fn reload(&self, model: Option<Arc<dyn TextModel>>) {
        let loaded = model.is_some();
        let mut slot = self.model.write().unwrap_or_else(|poisoned| {
            tracing::warn!("[Classifier] Model lock was poisoned, recovering...");
            poisoned.into_inner()
        });
        *slot = model;
        drop(slot);
        tracing::info!("[Classifier] Model reloaded (trained model present: {})", loaded);
    }

    pub fn current_model(&self) -> Option<Arc<dyn TextModel>> {
        match self.model.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn has_model(&self) -> bool {
        self.current_model().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Extractor returning canned text and counting calls
    struct FakeExtractor {
        text: String,
        calls: AtomicUsize,
    }

    impl FakeExtractor {
        fn new(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ContentExtractor for FakeExtractor {
        fn extract(&self, _path: &Path) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text.clone()
        }
    }

    struct FixedModel(&'static str, f32);

    impl TextModel for FixedModel {
        fn predict(&self, _text: &str) -> Result<Prediction, ModelError> {
            Ok(Prediction {
                label: self.0.to_string(),
                confidence: self.1,
            })
        }
    }

    struct BrokenModel;

    impl TextModel for BrokenModel {
        fn predict(&self, _text: &str) -> Result<Prediction, ModelError> {
            Err(ModelError::Corrupt("boom".to_string()))
        }
    }

    fn classifier(extractor: Arc<FakeExtractor>) -> Classifier {
        Classifier::new(Arc::new(Settings::with_home("/srv/sortdesk")), extractor)
    }

    fn categorized(c: Classification) -> (Category, f32, DecisionSource) {
        match c {
            Classification::Categorized {
                category,
                confidence,
                source,
            } => (category, confidence, source),
            Classification::Skipped => panic!("expected a category"),
        }
    }

    #[test]
    fn test_images_never_touch_extractor() {
        let extractor = FakeExtractor::new("invoice invoice invoice");
        let c = classifier(extractor.clone())
            .with_model(Some(Arc::new(FixedModel("Invoices", 0.99))));

        for name in ["a.png", "b.JPG", "c.jpeg"] {
            let result = categorized(c.classify(Path::new(name)));
            assert_eq!(result, (Category::Photos, 0.90, DecisionSource::Image));
        }
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_whitespace_text_uses_rules_not_model() {
        let extractor = FakeExtractor::new("  \n\t ");
        let c = classifier(extractor).with_model(Some(Arc::new(FixedModel("Reports", 0.95))));

        let result = categorized(c.classify(Path::new("/in/blank.txt")));
        assert_eq!(result, (Category::Others, 0.4, DecisionSource::Rules));
    }

    #[test]
    fn test_model_used_when_loaded() {
        let c = classifier(FakeExtractor::new("some body text"))
            .with_model(Some(Arc::new(FixedModel("Reports", 0.83))));
        let result = categorized(c.classify(Path::new("/in/q3.pdf")));
        assert_eq!(result, (Category::Reports, 0.83, DecisionSource::Model));
    }

    #[test]
    fn test_unknown_model_label_becomes_others() {
        let c = classifier(FakeExtractor::new("tax letter"))
            .with_model(Some(Arc::new(FixedModel("Taxes", 0.77))));
        let result = categorized(c.classify(Path::new("/in/letter.docx")));
        assert_eq!(result, (Category::Others, 0.77, DecisionSource::Model));
    }

    #[test]
    fn test_model_failure_falls_back_to_rules() {
        let c = classifier(FakeExtractor::new("my resume")).with_model(Some(Arc::new(BrokenModel)));
        let result = categorized(c.classify(Path::new("/in/me.txt")));
        assert_eq!(result, (Category::Resumes, 0.7, DecisionSource::Rules));
    }

    #[test]
    fn test_no_model_uses_rules() {
        let c = classifier(FakeExtractor::new("monthly bill"));
        assert!(!c.has_model());
        let result = categorized(c.classify(Path::new("/in/m.txt")));
        assert_eq!(result, (Category::Invoices, 0.6, DecisionSource::Rules));
    }

    #[test]
    fn test_unrecognized_extension_is_skipped() {
        let extractor = FakeExtractor::new("invoice");
        let c = classifier(extractor.clone());
        assert_eq!(c.classify(Path::new("/in/setup.exe")), Classification::Skipped);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reload_is_atomic_for_concurrent_readers() {
        let c = Arc::new(
            classifier(FakeExtractor::new("text"))
                .with_model(Some(Arc::new(FixedModel("Invoices", 0.61)))),
        );

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let (category, confidence, _) = c.classify_text("text");
                        let consistent = (category == Category::Invoices && confidence == 0.61)
                            || (category == Category::Reports && confidence == 0.62);
                        assert!(consistent, "saw {category:?} @ {confidence}");
                    }
                })
            })
            .collect();

        for i in 0..500 {
            let next: Arc<dyn TextModel> = if i % 2 == 0 {
                Arc::new(FixedModel("Reports", 0.62))
            } else {
                Arc::new(FixedModel("Invoices", 0.61))
            };
            c.reload(Some(next));
        }

        for r in readers {
            r.join().unwrap();
        }
    }

    #[test]
    fn test_in_flight_model_survives_reload() {
        let c = classifier(FakeExtractor::new("text"))
            .with_model(Some(Arc::new(FixedModel("Invoices", 0.61))));
        let held = c.current_model().unwrap();
        c.reload(None);
        assert!(!c.has_model());
        assert_eq!(held.predict("x").unwrap().label, "Invoices");
    }
}
