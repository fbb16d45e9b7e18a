//! Analysis worker
//!
//! The single consumer of the work queue. Each path is fully handled
//! (existence check, classification, ledger insert, broadcast) before the
//! next one is dequeued, so the worker is the only writer on the insert side
//! of the ledger. Running more than one worker is not supported.

use crate::models::{QueuedFile, Suggestion};
use crate::services::broadcast::Broadcaster;
use crate::services::classifier::{Classification, Classifier};
use crate::services::ledger::SuggestionLedger;
use crate::services::queue::{Dequeued, EventQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// How long a dequeue waits before re-checking for shutdown
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What happened to one dequeued path
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    Suggested(Suggestion),
    /// File was gone by the time it was dequeued
    Vanished,
    /// Classifier refused the extension
    Skipped,
}

pub struct AnalysisWorker {
    queue: Arc<EventQueue>,
    classifier: Arc<Classifier>,
    ledger: Arc<SuggestionLedger>,
    broadcaster: Option<Arc<Broadcaster>>,
}

impl AnalysisWorker {
    pub fn new(
        queue: Arc<EventQueue>,
        classifier: Arc<Classifier>,
        ledger: Arc<SuggestionLedger>,
        broadcaster: Option<Arc<Broadcaster>>,
    ) -> Self {
        Self {
            queue,
            classifier,
            ledger,
            broadcaster,
        }
    }

    /// Run the consume loop on a dedicated thread
    pub fn spawn(self) -> std::io::Result<WorkerHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let queue = Arc::clone(&self.queue);
        let flag = Arc::clone(&shutdown);

        let thread = std::thread::Builder::new()
            .name("analysis-worker".to_string())
            .spawn(move || self.run(&flag))?;

        Ok(WorkerHandle {
            shutdown,
            queue,
            thread: Some(thread),
        })
    }

    fn run(self, shutdown: &AtomicBool) {
        tracing::info!("[Worker] Analysis worker started");
        while !shutdown.load(Ordering::SeqCst) {
            match self.queue.pop_timeout(POLL_INTERVAL) {
                Dequeued::Item(file) => {
                    self.process(file);
                }
                Dequeued::TimedOut => continue,
                Dequeued::Closed => break,
            }
        }
        tracing::info!("[Worker] Analysis worker stopped");
    }

    /// Handle one dequeued path to completion
    pub fn process(&self, file: QueuedFile) -> Processed {
        let path = file.path();
        if !path.exists() {
            tracing::debug!("[Worker] {} disappeared before analysis", path.display());
            return Processed::Vanished;
        }

        let (category, confidence, source) = match self.classifier.classify(path) {
            Classification::Categorized {
                category,
                confidence,
                source,
            } => (category, confidence, source),
            Classification::Skipped => {
                tracing::debug!("[Worker] Skipped {}", path.display());
                return Processed::Skipped;
            }
        };

        let suggestion = Suggestion::new(file.into_path(), category, confidence);
        tracing::info!(
            "[Worker] {} -> {} ({:.2}, {:?})",
            suggestion.path.display(),
            category,
            suggestion.confidence,
            source
        );

        if self.ledger.insert(suggestion.clone()).is_some() {
            tracing::debug!(
                "[Worker] Superseded pending suggestion for {}",
                suggestion.path.display()
            );
        }
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.publish(&suggestion);
        }

        Processed::Suggested(suggestion)
    }
}

/// Owner of the running worker thread
pub struct WorkerHandle {
    shutdown: Arc<AtomicBool>,
    queue: Arc<EventQueue>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Stop after the in-flight item and join the thread
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop_and_join(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("[Worker] Analysis worker panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::Category;
    use crate::services::extractor::DocumentExtractor;
    use std::fs;
    use std::time::Instant;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        settings: Arc<Settings>,
        queue: Arc<EventQueue>,
        ledger: Arc<SuggestionLedger>,
        worker: AnalysisWorker,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let settings = Arc::new(Settings::with_home(temp.path()));
        settings.ensure_directories().unwrap();
        let queue = Arc::new(EventQueue::unbounded());
        let ledger = Arc::new(SuggestionLedger::new());
        let classifier = Arc::new(Classifier::new(
            settings.clone(),
            Arc::new(DocumentExtractor::new()),
        ));
        let worker = AnalysisWorker::new(queue.clone(), classifier, ledger.clone(), None);
        Fixture {
            _temp: temp,
            settings,
            queue,
            ledger,
            worker,
        }
    }

    fn write(settings: &Settings, name: &str, body: &str) -> QueuedFile {
        let path = settings.watch_dirs[0].join(name);
        fs::write(&path, body).unwrap();
        settings.recognize(&path).unwrap()
    }

    #[test]
    fn test_process_inserts_suggestion() {
        let f = fixture();
        let file = write(&f.settings, "bill.txt", "Electricity bill for June");

        let Processed::Suggested(s) = f.worker.process(file) else {
            panic!("expected a suggestion");
        };
        assert_eq!(s.suggested_category, Category::Invoices);
        assert_eq!(s.confidence, 0.6);
        assert_eq!(f.ledger.len(), 1);
    }

    #[test]
    fn test_vanished_file_is_discarded_silently() {
        let f = fixture();
        let file = write(&f.settings, "tmp.txt", "report");
        fs::remove_file(file.path()).unwrap();

        assert_eq!(f.worker.process(file), Processed::Vanished);
        assert!(f.ledger.is_empty());
    }

    #[test]
    fn test_requeued_path_supersedes() {
        let f = fixture();
        let file = write(&f.settings, "doc.txt", "meeting notes");
        f.worker.process(file.clone());
        fs::write(file.path(), "final report").unwrap();
        f.worker.process(file.clone());

        assert_eq!(f.ledger.len(), 1);
        let pending = f.ledger.find_by_path(file.path()).unwrap();
        assert_eq!(pending.suggested_category, Category::Reports);
    }

    #[test]
    fn test_image_suggestion() {
        let f = fixture();
        let file = write(&f.settings, "IMG_0001.jpg", "not really a jpeg");
        let Processed::Suggested(s) = f.worker.process(file) else {
            panic!("expected a suggestion");
        };
        assert_eq!(s.suggested_category, Category::Photos);
        assert_eq!(s.confidence, 0.90);
    }

    #[test]
    fn test_spawned_worker_drains_queue_in_order_and_shuts_down() {
        let f = fixture();
        let names = ["p1.txt", "p2.txt", "p3.txt"];
        for name in names {
            let file = write(&f.settings, name, "summary");
            f.queue.push(file).unwrap();
        }

        let ledger = f.ledger.clone();
        let handle = f.worker.spawn().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while ledger.len() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(handle.is_running());
        handle.shutdown();

        // Most recent first: the last dequeued path leads
        let order: Vec<_> = ledger
            .list(10)
            .into_iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(order, vec!["p3.txt", "p2.txt", "p1.txt"]);
        assert!(f.queue.is_closed());
    }
}
