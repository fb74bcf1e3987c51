//! Meal planning endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use pantry_core::SuggestionResult;

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub ingredients: Vec<String>,
}

/// Handler for `POST /api/v1/planning/suggestions`.
pub async fn meal_suggestions(
    State(state): State<GatewayState>,
    Json(request): Json<SuggestionRequest>,
) -> Result<(StatusCode, Json<SuggestionResult>), ApiError> {
    let ingredients: Vec<String> = request
        .ingredients
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    if ingredients.is_empty() {
        return Err(ApiError::bad_request("at least one ingredient is required"));
    }

    let result = state.pipeline.suggest_meals(&ingredients).await;
    let status = if result.outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(result)))
}
