use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::llm_client::ModelInfo;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelInfo>,
}

/// GET /api/v1/models
/// Models available to the configured API key that support text generation.
pub async fn handle_list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelListResponse>, AppError> {
    let models = state
        .llm
        .list_models()
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;
    Ok(Json(ModelListResponse { models }))
}
