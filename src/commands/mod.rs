//! HTTP and WebSocket boundary
//!
//! Thin axum handlers over the pipeline components held in [`AppState`].

pub mod socket;
pub mod suggestions;
pub mod training;
pub mod watcher;

use crate::config::Settings;
use crate::services::broadcast::Broadcaster;
use crate::services::classifier::Classifier;
use crate::services::ledger::SuggestionLedger;
use crate::services::mover::FileMover;
use crate::services::queue::EventQueue;
use crate::services::training::Trainer;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub queue: Arc<EventQueue>,
    pub ledger: Arc<SuggestionLedger>,
    pub classifier: Arc<Classifier>,
    pub mover: Arc<FileMover>,
    pub broadcaster: Arc<Broadcaster>,
    pub trainer: Arc<Trainer>,
    /// Directories the running watcher registered
    pub watched: Arc<Vec<PathBuf>>,
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/suggestions", get(suggestions::list_suggestions))
        .route("/apply", post(suggestions::apply_suggestion))
        .route("/config", get(watcher::get_config))
        .route("/status", get(watcher::get_status))
        .route("/trainingData", get(training::get_training_data))
        .route("/train", post(training::train));

    let mut app = Router::new()
        .nest("/api", api)
        .route("/ws", get(socket::websocket_handler));

    if state.settings.static_dir.is_dir() {
        app = app.nest_service("/static", ServeDir::new(&state.settings.static_dir));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::extractor::DocumentExtractor;
    use crate::services::training::TrainingStore;
    use tempfile::TempDir;

    /// State over a temp home; must be built inside a tokio runtime
    pub fn state() -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let settings = Arc::new(Settings::with_home(temp.path()));
        settings.ensure_directories().unwrap();

        let ledger = Arc::new(SuggestionLedger::new());
        let classifier = Arc::new(Classifier::new(
            settings.clone(),
            Arc::new(DocumentExtractor::new()),
        ));
        let trainer = Arc::new(Trainer::new(
            Arc::new(TrainingStore::with_baseline()),
            classifier.clone(),
            settings.model_path.clone(),
        ));

        let state = AppState {
            queue: Arc::new(EventQueue::unbounded()),
            mover: Arc::new(FileMover::new(settings.clone(), ledger.clone())),
            broadcaster: Broadcaster::start(),
            watched: Arc::new(settings.watch_dirs.clone()),
            ledger,
            classifier,
            trainer,
            settings,
        };
        (temp, state)
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
