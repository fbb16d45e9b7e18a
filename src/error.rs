//! Error types shared across the pipeline.
//!
//! Recoverable conditions (extraction failures, model failures, vanished
//! files, dead subscribers) have their own small typed outcomes next to the
//! component that produces them. `SortError` covers the structural failures
//! that are surfaced to the operator.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SortError>;

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// A watched directory could not be registered with the OS watcher.
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watched directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("failed to create watcher: {0}")]
    WatcherSetup(#[source] notify::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact at {path} is unreadable: {source}")]
    ModelFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("training failed: {0}")]
    Training(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SortError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
