//! In-memory ledger of pending suggestions
//!
//! Most-recent-first. At most one entry per path: inserting a path that is
//! already pending replaces the old entry and moves it to the front.
//! Readers share the lock; every mutation goes through the same write lock,
//! which orders worker inserts against accept/reject removals.

use crate::models::Suggestion;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct SuggestionLedger {
    entries: RwLock<VecDeque<Suggestion>>,
}

impl SuggestionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Suggestion>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Suggestion>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            tracing::warn!("[Ledger] Lock was poisoned, recovering...");
            poisoned.into_inner()
        })
    }

    /// Prepend, superseding any pending entry for the same path.
    /// Returns the superseded entry.
    pub fn insert(&self, suggestion: Suggestion) -> Option<Suggestion> {
        let mut entries = self.write();
        let previous = entries
            .iter()
            .position(|s| s.path == suggestion.path)
            .and_then(|i| entries.remove(i));
        entries.push_front(suggestion);
        previous
    }

    /// Up to `limit` entries, newest first
    pub fn list(&self, limit: usize) -> Vec<Suggestion> {
        self.read().iter().take(limit).cloned().collect()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<Suggestion> {
        self.read().iter().find(|s| s.path == path).cloned()
    }

    /// Idempotent; removing an absent path returns `None`
    pub fn remove(&self, path: &Path) -> Option<Suggestion> {
        let mut entries = self.write();
        let index = entries.iter().position(|s| s.path == path)?;
        entries.remove(index)
    }

    /// Put back an entry taken out with `remove`, unless a newer suggestion
    /// for the same path arrived meanwhile. Keeps newest-first order.
    pub fn restore(&self, suggestion: Suggestion) -> bool {
        let mut entries = self.write();
        if entries.iter().any(|s| s.path == suggestion.path) {
            return false;
        }
        let index = entries
            .iter()
            .position(|s| s.timestamp <= suggestion.timestamp)
            .unwrap_or(entries.len());
        entries.insert(index, suggestion);
        true
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    fn suggestion(path: &str, category: Category) -> Suggestion {
        Suggestion::new(PathBuf::from(path), category, 0.5)
    }

    #[test]
    fn test_insert_supersedes_same_path() {
        let ledger = SuggestionLedger::new();
        assert!(ledger.insert(suggestion("/in/a.txt", Category::Others)).is_none());
        ledger.insert(suggestion("/in/b.txt", Category::Reports));
        let old = ledger.insert(suggestion("/in/a.txt", Category::Invoices));

        assert_eq!(old.unwrap().suggested_category, Category::Others);
        assert_eq!(ledger.len(), 2);
        let listed = ledger.list(10);
        assert_eq!(listed[0].path, PathBuf::from("/in/a.txt"));
        assert_eq!(listed[0].suggested_category, Category::Invoices);
        assert_eq!(listed[1].path, PathBuf::from("/in/b.txt"));
    }

    #[test]
    fn test_list_is_reverse_insertion_and_truncated() {
        let ledger = SuggestionLedger::new();
        for i in 0..5 {
            ledger.insert(suggestion(&format!("/in/{i}.txt"), Category::Others));
        }

        assert!(ledger.list(0).is_empty());
        let names: Vec<_> = ledger
            .list(3)
            .into_iter()
            .map(|s| s.path.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["/in/4.txt", "/in/3.txt", "/in/2.txt"]);
        assert_eq!(ledger.list(50).len(), 5);
    }

    #[test]
    fn test_find_and_remove() {
        let ledger = SuggestionLedger::new();
        ledger.insert(suggestion("/in/a.txt", Category::Resumes));

        assert!(ledger.find_by_path(Path::new("/in/a.txt")).is_some());
        assert!(ledger.remove(Path::new("/in/a.txt")).is_some());
        assert!(ledger.find_by_path(Path::new("/in/a.txt")).is_none());
        // second removal is a no-op
        assert!(ledger.remove(Path::new("/in/a.txt")).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_concurrent_writers_keep_paths_unique() {
        let ledger = Arc::new(SuggestionLedger::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..50 {
                        ledger.insert(suggestion(&format!("/in/{}.txt", i % 10), Category::Others));
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(ledger.len(), 10);
    }

    #[test]
    fn test_restore_keeps_order_and_yields_to_newer() {
        let ledger = SuggestionLedger::new();
        ledger.insert(suggestion("/in/a.txt", Category::Invoices));
        thread::sleep(std::time::Duration::from_millis(2));
        ledger.insert(suggestion("/in/b.txt", Category::Reports));

        let taken = ledger.remove(Path::new("/in/a.txt")).unwrap();
        assert!(ledger.restore(taken));
        let listed = ledger.list(10);
        assert_eq!(listed[0].path, PathBuf::from("/in/b.txt"));
        assert_eq!(listed[1].path, PathBuf::from("/in/a.txt"));

        // A fresh suggestion for the path wins over the restored one
        let stale = ledger.remove(Path::new("/in/b.txt")).unwrap();
        ledger.insert(suggestion("/in/b.txt", Category::Resumes));
        assert!(!ledger.restore(stale));
        let current = ledger.find_by_path(Path::new("/in/b.txt")).unwrap();
        assert_eq!(current.suggested_category, Category::Resumes);
        assert_eq!(ledger.len(), 2);
    }
}
