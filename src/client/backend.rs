use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::GenerationError;
use crate::meals::dto::{
    GenerateImageRequest, GenerateImageResponse, GenerateRequest, GenerateResponse,
};
use crate::state::AppState;
use crate::{images, meals};

/// The two calls the client makes against the meal API.
#[async_trait]
pub trait MealBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerationError>;

    async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse, GenerationError>;
}

/// Talks to a running `dietgen serve` over HTTP.
pub struct HttpBackend {
    client: Client,
    api_url: String,
}

impl HttpBackend {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, GenerationError> {
        let url = format!("{}{}", self.api_url, path);
        debug!(%url, "posting to meal api");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(GenerationError::Status(status, detail));
        }
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl MealBackend for HttpBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        self.post_json("/api/generate", request).await
    }

    async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse, GenerationError> {
        self.post_json("/api/generate-image", request).await
    }
}

/// Runs the server-side services in process, no HTTP hop.
pub struct InProcessBackend {
    state: AppState,
}

impl InProcessBackend {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl MealBackend for InProcessBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        meals::services::generate(&self.state, request.clone())
            .await
            .map_err(|e| GenerationError::Rejected(e.to_string()))
    }

    async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse, GenerationError> {
        let image =
            images::services::generate_meal_image(&self.state, &request.name, &request.ingredients)
                .await
                .map_err(|e| GenerationError::Rejected(e.to_string()))?;
        Ok(GenerateImageResponse { image })
    }
}
