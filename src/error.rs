use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::meals::prompt::PromptError;
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Failed to generate: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Provider(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Same status, body without the `success` flag (`{ "error": ... }`).
    pub fn bare(self) -> BareApiError {
        BareApiError(self)
    }
}

impl From<PromptError> for ApiError {
    fn from(e: PromptError) -> Self {
        match e {
            PromptError::MissingIntent => ApiError::BadRequest(e.to_string()),
            PromptError::Serialize(..) => ApiError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": format!("{self:#}") });
        (self.status(), Json(body)).into_response()
    }
}

pub struct BareApiError(ApiError);

impl IntoResponse for BareApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": format!("{:#}", self.0) });
        (self.0.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn missing_intent_maps_to_bad_request() {
        let e: ApiError = PromptError::MissingIntent.into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_failure_maps_to_500() {
        let e: ApiError = ProviderError::Invariant("openai", "no choices".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.to_string().starts_with("Failed to generate"));
    }
}
