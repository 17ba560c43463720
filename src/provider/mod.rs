//! Outbound calls to the language-model and image-model providers.

pub mod openai;
pub mod schema;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::meals::model::MealType;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not be sent or the body could not be read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success status from the provider.
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The provider answered with something we cannot use (no choices, no image).
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    #[error("Invalid base64 image payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// One chat-completion call producing at most one `create_meal` function call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Members of the `mealType` enum in the function schema.
    pub meal_types: Vec<MealType>,
    /// Force the function call instead of letting the model reply in text.
    pub force_function: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Raw function-call arguments, untouched.
    pub arguments: Option<String>,
    /// Plain assistant text, if the model answered without (or beside) the call.
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedImage {
    Url(String),
    Encoded {
        bytes: Bytes,
        content_type: &'static str,
    },
}

#[async_trait]
pub trait MealProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Produces a single square image for `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError>;
}
