use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{error, instrument};

use super::dto::{GenerateRequest, GenerateResponse};
use super::services;
use crate::{error::ApiError, state::AppState};

pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/generate", post(generate_meal))
}

/// POST /api/generate
#[instrument(skip(state, payload))]
pub async fn generate_meal(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = payload?;
    match services::generate(&state, body).await {
        Ok(resp) => Ok(Json(resp)),
        Err(e) => {
            error!(error = %e, "generate_meal failed");
            Err(e)
        }
    }
}
