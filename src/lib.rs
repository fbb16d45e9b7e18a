pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use commands::AppState;
use config::Settings;
use error::{Result, SortError};
use services::broadcast::Broadcaster;
use services::classifier::{Classifier, NaiveBayesModel, TextModel};
use services::extractor::DocumentExtractor;
use services::ledger::SuggestionLedger;
use services::mover::FileMover;
use services::queue::EventQueue;
use services::training::{Trainer, TrainingStore};
use services::watcher::DirectoryWatcher;
use services::worker::AnalysisWorker;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the pipeline and serve HTTP until Ctrl-C
pub async fn run() -> Result<()> {
    // Current dir first, then the parent when launched from a subdirectory
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }

    // RUST_LOG=debug for per-file logs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,sortdesk=info")),
        )
        .init();

    let settings = Arc::new(Settings::from_env()?);
    settings.ensure_directories()?;

    let model: Option<Arc<dyn TextModel>> = match NaiveBayesModel::load(&settings.model_path) {
        Ok(Some(model)) => {
            tracing::info!(
                "[Startup] Loaded text model ({} samples, labels {:?}) from {}",
                model.sample_count(),
                model.labels().collect::<Vec<_>>(),
                settings.model_path.display()
            );
            Some(Arc::new(model))
        }
        Ok(None) => {
            tracing::info!("[Startup] No trained model found, using keyword rules");
            None
        }
        Err(e) => {
            tracing::warn!("[Startup] Ignoring model artifact: {}", e);
            None
        }
    };

    let queue = Arc::new(EventQueue::with_capacity(settings.queue_capacity));
    let ledger = Arc::new(SuggestionLedger::new());
    let classifier = Arc::new(
        Classifier::new(settings.clone(), Arc::new(DocumentExtractor::new())).with_model(model),
    );
    let trainer = Arc::new(Trainer::new(
        Arc::new(TrainingStore::with_baseline()),
        classifier.clone(),
        settings.model_path.clone(),
    ));
    let broadcaster = Broadcaster::start();

    let watcher = DirectoryWatcher::new(settings.clone(), queue.clone()).start()?;
    let worker = AnalysisWorker::new(
        queue.clone(),
        classifier.clone(),
        ledger.clone(),
        Some(broadcaster.clone()),
    )
    .spawn()
    .map_err(|e| SortError::io("failed to spawn analysis worker", e))?;

    let state = AppState {
        mover: Arc::new(FileMover::new(settings.clone(), ledger.clone())),
        watched: Arc::new(watcher.watched_paths()),
        settings: settings.clone(),
        queue,
        ledger,
        classifier,
        broadcaster,
        trainer,
    };

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .map_err(|e| SortError::io(format!("failed to bind {}", settings.bind_addr), e))?;
    tracing::info!("[Startup] Listening on http://{}", settings.bind_addr);

    let served = axum::serve(listener, commands::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    watcher.stop();
    worker.shutdown();

    served.map_err(|e| SortError::io("HTTP server failed", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[Startup] Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[Startup] Shutting down");
}
