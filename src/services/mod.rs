pub mod broadcast;
pub mod classifier;
pub mod extractor;
pub mod ledger;
pub mod mover;
pub mod queue;
pub mod training;
pub mod watcher;
pub mod worker;
