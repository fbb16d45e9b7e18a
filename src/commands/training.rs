use super::{AppError, AppResult, AppState};
use crate::models::TrainingSample;
use crate::services::training::validate_samples;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingData {
    pub count: usize,
    pub samples: Vec<TrainingSample>,
}

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub samples: Vec<TrainingSample>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainResponse {
    pub sample_count: usize,
}

pub async fn get_training_data(State(state): State<AppState>) -> Json<TrainingData> {
    let samples = state.trainer.store().samples();
    Json(TrainingData {
        count: samples.len(),
        samples,
    })
}

/// Append labelled samples and retrain the text model
pub async fn train(
    State(state): State<AppState>,
    Json(request): Json<TrainRequest>,
) -> AppResult<Json<TrainResponse>> {
    if request.samples.is_empty() {
        return Err(AppError::bad_request("no samples provided"));
    }
    validate_samples(&request.samples).map_err(|e| AppError::bad_request(e.to_string()))?;

    let trainer = state.trainer.clone();
    let result = tokio::task::spawn_blocking(move || trainer.append_and_retrain(request.samples))
        .await
        .map_err(|e| AppError::internal(format!("training task failed: {}", e)))?;

    match result {
        Ok(sample_count) => Ok(Json(TrainResponse { sample_count })),
        Err(e) => {
            tracing::error!("[API] Training failed: {}", e);
            Err(AppError::internal(e.to_string()))
        }
    }
}
