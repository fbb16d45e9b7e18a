//! Accept/reject handling for pending suggestions
//!
//! Accepting moves the file into its category folder. A file that vanished
//! since it was suggested is an expected outcome: the stale suggestion is
//! removed and `NotFound` is reported. Any other move failure leaves the
//! suggestion pending so the operator can retry.
//!
//! Decisions are linearized through the ledger's write lock: `remove`
//! hands the entry to exactly one caller.

use crate::config::Settings;
use crate::services::ledger::SuggestionLedger;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyOutcome {
    /// Destination path of the moved file
    MovedTo(PathBuf),
    Rejected(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to move {path} to {destination}: {source}")]
    Move {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct FileMover {
    settings: Arc<Settings>,
    ledger: Arc<SuggestionLedger>,
    // Held across destination choice and move so two accepts never pick
    // the same free name
    moves: Mutex<()>,
}

impl FileMover {
    pub fn new(settings: Arc<Settings>, ledger: Arc<SuggestionLedger>) -> Self {
        Self {
            settings,
            ledger,
            moves: Mutex::new(()),
        }
    }

    /// The pending entry is taken out of the ledger up front, so of two
    /// concurrent decisions on one path only the first sees it; the other
    /// gets `NotFound`. A failed move puts the entry back.
    pub fn apply(&self, path: &Path, accept: bool) -> Result<ApplyOutcome, ApplyError> {
        let suggestion = self
            .ledger
            .remove(path)
            .ok_or_else(|| ApplyError::NotFound(path.to_path_buf()))?;

        if !accept {
            tracing::info!("[Mover] Rejected suggestion for {}", path.display());
            return Ok(ApplyOutcome::Rejected(path.to_path_buf()));
        }

        if !path.exists() {
            tracing::info!("[Mover] {} vanished before it could be moved", path.display());
            return Err(ApplyError::NotFound(path.to_path_buf()));
        }

        let folder = self.settings.folder_for(suggestion.suggested_category);
        let moved = {
            let _guard = self.moves.lock().unwrap_or_else(|p| p.into_inner());
            fs::create_dir_all(&folder).and_then(|_| {
                let destination = unique_destination(&folder, path);
                move_file(path, &destination).map(|_| destination)
            })
        };

        match moved {
            Ok(destination) => {
                tracing::info!(
                    "[Mover] Moved {} to {}",
                    path.display(),
                    destination.display()
                );
                Ok(ApplyOutcome::MovedTo(destination))
            }
            // Lost a race with an external move/delete
            Err(e) if e.kind() == io::ErrorKind::NotFound && !path.exists() => {
                Err(ApplyError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                tracing::warn!("[Mover] Move of {} failed: {}", path.display(), source);
                if !self.ledger.restore(suggestion) {
                    tracing::debug!(
                        "[Mover] Newer suggestion for {} already pending",
                        path.display()
                    );
                }
                Err(ApplyError::Move {
                    path: path.to_path_buf(),
                    destination: folder,
                    source,
                })
            }
        }
    }
}

/// `folder/name`, or `folder/name (n).ext` if that is already taken
fn unique_destination(folder: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unnamed".to_string());
    let candidate = folder.join(&name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.clone());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| folder.join(format!("{stem} ({n}){ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Rename, falling back to copy + remove across filesystems
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            if let Err(remove_err) = fs::remove_file(from) {
                // Keep exactly one copy
                let _ = fs::remove_file(to);
                return Err(remove_err);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
