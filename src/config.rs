use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use crate::meals::model::MealType;

const DEFAULT_SCHEMA_TYPES: &str = "breakfast,lunch,dinner";

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub image_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    /// Members of the `mealType` enum offered to the provider.
    pub meal_types: Vec<MealType>,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let openai = OpenAiConfig {
            api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?,
            base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            image_model: env_or("OPENAI_IMAGE_MODEL", "dall-e-3"),
        };
        let meal_types = MealType::parse_list(&env_or("MEAL_TYPES", DEFAULT_SCHEMA_TYPES))
            .context("MEAL_TYPES")?;
        let storage = StorageConfig {
            endpoint: env_or("MINIO_ENDPOINT", "http://localhost:9000"),
            bucket: env_or("MINIO_BUCKET", "dietgen"),
            access_key: env_or("MINIO_ACCESS_KEY", "minioadmin"),
            secret_key: env_or("MINIO_SECRET_KEY", "minioadmin"),
            region: env_or("MINIO_REGION", "us-east-1"),
            url_ttl_secs: std::env::var("IMAGE_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(7 * 24 * 60 * 60),
        };
        Ok(Self {
            openai,
            meal_types,
            storage,
        })
    }
}

/// Settings for the client side: where the API lives and how local state is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    /// Off in development to avoid paying for images.
    pub image_generation_enabled: bool,
    /// Types requested by a meal plan. Snack is left out by default.
    pub plan_meal_types: Vec<MealType>,
    pub state_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_url: env_or("DIETGEN_API_URL", "http://localhost:8080"),
            image_generation_enabled: std::env::var("IMAGE_GENERATION_ENABLED")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
            plan_meal_types: MealType::parse_list(&env_or(
                "PLAN_MEAL_TYPES",
                DEFAULT_SCHEMA_TYPES,
            ))
            .context("PLAN_MEAL_TYPES")?,
            state_file: PathBuf::from(env_or("DIETGEN_STATE_FILE", ".dietgen/local-storage.json")),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
