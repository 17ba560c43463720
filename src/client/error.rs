use thiserror::Error;

/// Shown to the user for every failed generation, whatever the cause.
pub const GENERATION_FAILED: &str = "Failed to generate meal. Please try again.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error! status: {0}: {1}")]
    Status(reqwest::StatusCode, String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("provider returned malformed meal arguments: {0}")]
    Malformed(String),
    #[error("provider returned no meal")]
    NoMeal,
    #[error("could not persist meal: {0:#}")]
    Storage(anyhow::Error),
}

impl GenerationError {
    pub fn user_message(&self) -> &'static str {
        GENERATION_FAILED
    }
}
