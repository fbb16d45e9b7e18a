use super::AppState;
use crate::config::ConfigSnapshot;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub watching: Vec<String>,
    /// Suggestions awaiting a decision
    pub pending: usize,
    /// Paths waiting for analysis
    pub queued: usize,
    pub subscribers: usize,
    pub model_loaded: bool,
}

/// Watched directories, category folders and recognized extensions
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigSnapshot> {
    Json(state.settings.snapshot())
}

pub async fn get_status(State(state): State<AppState>) -> Json<PipelineStatus> {
    Json(PipelineStatus {
        watching: state
            .watched
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        pending: state.ledger.len(),
        queued: state.queue.len(),
        subscribers: state.broadcaster.subscriber_count(),
        model_loaded: state.classifier.has_model(),
    })
}
