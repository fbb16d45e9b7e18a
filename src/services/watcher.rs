use crate::config::Settings;
use crate::error::{Result, SortError};
use crate::services::queue::{EventQueue, PushError};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on size samples before a still-growing file is enqueued anyway
const MAX_STABILITY_CHECKS: u32 = 10;

/// Individual folder watcher
struct FolderWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

/// Watches the configured directories and feeds new files into the queue
pub struct DirectoryWatcher {
    settings: Arc<Settings>,
    queue: Arc<EventQueue>,
}

/// Running watcher; stopping (or dropping) it releases the OS watches
pub struct WatcherHandle {
    watchers: BTreeMap<PathBuf, FolderWatcher>,
}

impl DirectoryWatcher {
    pub fn new(settings: Arc<Settings>, queue: Arc<EventQueue>) -> Self {
        Self { settings, queue }
    }

    /// Register every watched directory. Any failure aborts start-up and
    /// releases the watches created so far.
    pub fn start(self) -> Result<WatcherHandle> {
        let mut watchers = BTreeMap::new();

        for dir in &self.settings.watch_dirs {
            if !dir.is_dir() {
                return Err(SortError::MissingDirectory(dir.clone()));
            }

            let settings = Arc::clone(&self.settings);
            let queue = Arc::clone(&self.queue);
            let watched_folder = dir.clone();

            // Debounce window doubles as the grace period for partial writes
            let mut debouncer = new_debouncer(
                self.settings.grace,
                None,
                move |result: std::result::Result<Vec<DebouncedEvent>, Vec<notify::Error>>| {
                    match result {
                        Ok(events) => {
                            for event in events {
                                handle_file_event(&settings, &queue, &event, &watched_folder);
                            }
                        }
                        Err(errors) => {
                            for error in errors {
                                tracing::warn!("[Watcher] Watcher error: {:?}", error);
                            }
                        }
                    }
                },
            )
            .map_err(SortError::WatcherSetup)?;

            debouncer
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| SortError::Watch {
                    path: dir.clone(),
                    source,
                })?;

            watchers.insert(dir.clone(), FolderWatcher { debouncer });
        }

        tracing::info!("[Watcher] Monitoring started on: {:?}", self.settings.watch_dirs);
        Ok(WatcherHandle { watchers })
    }
}

impl WatcherHandle {
    /// Stop all debouncer threads and release the OS watches
    pub fn stop(self) {
        for (path, watcher) in self.watchers {
            watcher.debouncer.stop();
            tracing::debug!("[Watcher] Stopped watching {}", path.display());
        }
        tracing::info!("[Watcher] Monitoring stopped");
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watchers.keys().cloned().collect()
    }
}

/// Paths an event brings into the watched folder: new files and rename targets
fn qualifying_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        // [from, to]; only the destination matters
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        // Backends that cannot tell rename direction: keep paths that now exist
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().filter(|p| p.exists()).cloned().collect()
        }
        _ => Vec::new(),
    }
}

/// Hidden files, temp files and partial downloads
fn is_ignored_name(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    file_name.is_empty()
        || file_name.starts_with('.')
        || file_name.ends_with(".tmp")
        || file_name.ends_with(".crdownload")
        || file_name.ends_with(".part")
        || file_name.ends_with(".download")
}

/// Handle a file event
fn handle_file_event(
    settings: &Settings,
    queue: &EventQueue,
    event: &DebouncedEvent,
    watched_folder: &Path,
) {
    for path in qualifying_paths(event) {
        // Non-recursive watch, but rename targets can point elsewhere
        if path.parent() != Some(watched_folder) && !same_dir(&path, watched_folder) {
            continue;
        }

        if is_ignored_name(&path) {
            continue;
        }

        // Unrecognized extensions are dropped without noise
        let Some(file) = settings.recognize(&path) else {
            tracing::trace!("[Watcher] Ignoring {}", path.display());
            continue;
        };

        // Get file info (use symlink_metadata to not follow symlinks)
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("[Watcher] Dropping {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        if !wait_until_stable(&path, settings.grace, MAX_STABILITY_CHECKS) {
            tracing::debug!("[Watcher] {} vanished while settling", path.display());
            continue;
        }

        match queue.push(file) {
            Ok(()) => tracing::debug!("[Watcher] Queued {}", path.display()),
            Err(PushError::Full(pending)) => tracing::warn!(
                "[Watcher] Queue full ({} pending), dropping {}",
                pending,
                path.display()
            ),
            Err(PushError::Closed) => {
                tracing::debug!("[Watcher] Queue closed, dropping {}", path.display())
            }
        }
    }
}

/// Compare canonical parents; event paths may be canonical while the
/// configured folder is not (e.g. /var vs /private/var on macOS)
fn same_dir(path: &Path, folder: &Path) -> bool {
    match (
        path.parent().and_then(|p| p.canonicalize().ok()),
        folder.canonicalize().ok(),
    ) {
        (Some(parent), Some(folder)) => parent == folder,
        _ => false,
    }
}

/// Poll the file size until two samples one interval apart agree.
/// Heuristic only: a writer that pauses longer than `interval` still slips
/// through. Returns false if the file disappears.
fn wait_until_stable(path: &Path, interval: Duration, max_checks: u32) -> bool {
    let size = |p: &Path| std::fs::metadata(p).ok().map(|m| m.len());

    let Some(mut last) = size(path) else {
        return false;
    };
    for _ in 0..max_checks {
        std::thread::sleep(interval);
        let Some(current) = size(path) else {
            return false;
        };
        if current == last {
            return true;
        }
        last = current;
    }
    tracing::debug!(
        "[Watcher] {} still growing after {} checks, queuing anyway",
        path.display(),
        max_checks
    );
    true
}
