use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{error, instrument};

use super::services::generate_meal_image;
use crate::{
    error::{ApiError, BareApiError},
    meals::dto::{GenerateImageRequest, GenerateImageResponse},
    state::AppState,
};

pub fn image_routes() -> Router<AppState> {
    Router::new().route("/generate-image", post(generate_image))
}

/// POST /api/generate-image { name, ingredients }
#[instrument(skip(state, payload))]
pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<GenerateImageResponse>, BareApiError> {
    let Json(body) = payload.map_err(|e| ApiError::from(e).bare())?;
    match generate_meal_image(&state, &body.name, &body.ingredients).await {
        Ok(image) => Ok(Json(GenerateImageResponse { image })),
        Err(e) => {
            error!(error = %e, "generate_image failed");
            Err(e.bare())
        }
    }
}
