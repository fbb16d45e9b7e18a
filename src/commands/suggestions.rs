use super::{AppError, AppResult, AppState};
use crate::models::Suggestion;
use crate::services::mover::{ApplyError, ApplyOutcome};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyQuery {
    pub path: String,
    #[serde(default = "default_accept")]
    pub accept: bool,
}

fn default_accept() -> bool {
    true
}

/// Pending suggestions, most recent first
pub async fn list_suggestions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Suggestion>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(state.ledger.list(limit))
}

/// Accept (move) or reject a pending suggestion
pub async fn apply_suggestion(
    State(state): State<AppState>,
    Query(query): Query<ApplyQuery>,
) -> AppResult<Json<ApplyOutcome>> {
    let path = PathBuf::from(&query.path);
    let mover = state.mover.clone();
    let accept = query.accept;

    let result = tokio::task::spawn_blocking(move || mover.apply(&path, accept))
        .await
        .map_err(|e| AppError::internal(format!("apply task failed: {}", e)))?;

    match result {
        Ok(outcome) => Ok(Json(outcome)),
        Err(ApplyError::NotFound(path)) => Err(AppError::not_found(format!(
            "no pending suggestion for {}",
            path.display()
        ))),
        Err(e @ ApplyError::Move { .. }) => {
            tracing::error!("[API] {}", e);
            Err(AppError::internal(e.to_string()))
        }
    }
}
