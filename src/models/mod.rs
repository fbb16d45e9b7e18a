//! Core data types flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Destination bucket for a classified file
///
/// The set is closed at compile time. Labels produced by a retrained model
/// that fall outside it are folded into `Others` by [`Category::from_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Invoices,
    Reports,
    Photos,
    Resumes,
    Others,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Invoices,
        Category::Reports,
        Category::Photos,
        Category::Resumes,
        Category::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Invoices => "Invoices",
            Category::Reports => "Reports",
            Category::Photos => "Photos",
            Category::Resumes => "Resumes",
            Category::Others => "Others",
        }
    }

    /// Strict parse, used to validate operator-submitted training labels
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label.trim()))
    }

    /// Lenient parse for model output: anything unknown is `Others`
    pub fn from_label(label: &str) -> Self {
        Self::parse(label).unwrap_or(Category::Others)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending, unconfirmed classification result for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub path: PathBuf,
    pub suggested_category: Category,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl Suggestion {
    /// Build a suggestion stamped with the current time
    pub fn new(path: PathBuf, category: Category, confidence: f32) -> Self {
        Self {
            path,
            suggested_category: category,
            confidence: clamp_confidence(confidence),
            timestamp: Utc::now(),
        }
    }
}

/// Keep confidence inside [0, 1]; NaN collapses to 0
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Labelled text contributing to the trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub text: String,
    pub label: String,
}

impl TrainingSample {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// How a file is handled by the classifier, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Image,
}

/// Lower-cased extension with its leading dot (`.pdf`), matching how the
/// extension sets are configured
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// A file path whose extension is known to be a text or image type
///
/// Only [`crate::config::Settings::recognize`] hands these out, which keeps
/// unrecognized extensions out of the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    path: PathBuf,
    kind: FileKind,
}

impl QueuedFile {
    pub(crate) fn new(path: PathBuf, kind: FileKind) -> Self {
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}
