//! Scripted collaborators shared by the client tests.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::backend::MealBackend;
use super::error::GenerationError;
use crate::meals::dto::{
    GenerateImageRequest, GenerateImageResponse, GenerateRequest, GenerateResponse,
};
use crate::meals::model::{ActivityLevel, Goal, HeightUnit, MealType, UserSettings, WeightUnit};

pub fn settings() -> UserSettings {
    UserSettings {
        age: Some(41),
        gender: Some("female".into()),
        weight: Some(150.0),
        weight_unit: WeightUnit::Lbs,
        height: Some(65.0),
        height_unit: HeightUnit::In,
        activity: Some(ActivityLevel::Sedentary),
        goal: Some(Goal::GainWeight),
        favourite_foods: Some("rice".into()),
        disliked_foods: None,
        additional_info: Some("vegetarian".into()),
    }
}

pub fn meal_args(name: &str, meal_type: &str) -> Value {
    json!({
        "meal": {
            "name": name,
            "ingredients": [format!("{name} base"), "salt"],
            "instructions": ["prepare", "serve"],
            "mealType": meal_type
        }
    })
}

#[derive(Debug, Clone)]
pub enum Reply {
    Args(Value),
    Text(String),
    Fail(u16),
}

/// Answers from a script: per requested meal type first, then `default`.
pub struct ScriptedBackend {
    pub default: Reply,
    pub by_type: HashMap<MealType, (Reply, Duration)>,
    pub image_fails: bool,
    pub calls: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new(default: Reply) -> Self {
        Self {
            default,
            by_type: HashMap::new(),
            image_fails: false,
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

fn status(code: u16) -> GenerationError {
    GenerationError::Status(
        reqwest::StatusCode::from_u16(code).unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
        "scripted failure".into(),
    )
}

#[async_trait]
impl MealBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        self.calls.lock().push("generate".into());
        self.requests.lock().push(request.clone());
        let (reply, delay) = request
            .meal_type
            .and_then(|t| self.by_type.get(&t).cloned())
            .unwrap_or((self.default.clone(), Duration::ZERO));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Reply::Args(meals) => Ok(GenerateResponse {
                success: true,
                meals,
                user_settings: request.user_settings.clone(),
                message: None,
            }),
            Reply::Text(text) => Ok(GenerateResponse {
                success: true,
                meals: Value::Null,
                user_settings: None,
                message: Some(text),
            }),
            Reply::Fail(code) => Err(status(code)),
        }
    }

    async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse, GenerationError> {
        self.calls.lock().push(format!("image:{}", request.name));
        if self.image_fails {
            return Err(status(500));
        }
        Ok(GenerateImageResponse {
            image: format!("https://img.test/{}.png", request.name),
        })
    }
}
