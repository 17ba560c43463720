use crate::config::AppConfig;
use crate::provider::{openai::OpenAiProvider, ImageProvider, MealProvider};
use crate::storage::{Storage, StorageClient};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub meals: Arc<dyn MealProvider>,
    pub images: Arc<dyn ImageProvider>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let openai = Arc::new(OpenAiProvider::new(&config.openai));

        // Реальный S3/MinIO
        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        Ok(Self {
            config,
            meals: openai.clone() as Arc<dyn MealProvider>,
            images: openai as Arc<dyn ImageProvider>,
            storage,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        meals: Arc<dyn MealProvider>,
        images: Arc<dyn ImageProvider>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            config,
            meals,
            images,
            storage,
        }
    }
}
