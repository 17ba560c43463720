use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{Meal, MealType, UserSettings};

/// Body of `POST /api/generate`.
///
/// A non-blank `message` drives intent; otherwise `user_settings` (and the
/// optional `meal_type`) do. `existing_meals` is context only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings: Option<UserSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub existing_meals: Vec<Meal>,
}

impl GenerateRequest {
    pub fn builder() -> GenerateRequestBuilder {
        GenerateRequestBuilder::default()
    }

    /// The chat message, if one was given and it is not blank.
    pub fn instruction(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct GenerateRequestBuilder {
    inner: GenerateRequest,
}

impl GenerateRequestBuilder {
    pub fn settings(mut self, settings: Option<&UserSettings>) -> Self {
        self.inner.user_settings = settings.cloned();
        self
    }

    pub fn meal_type(mut self, meal_type: Option<MealType>) -> Self {
        self.inner.meal_type = meal_type;
        self
    }

    /// Blank messages are dropped so they never take precedence over settings.
    pub fn message(mut self, message: Option<&str>) -> Self {
        self.inner.message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        self
    }

    pub fn existing_meals(mut self, meals: &[Meal]) -> Self {
        self.inner.existing_meals = meals.to_vec();
        self
    }

    pub fn build(self) -> GenerateRequest {
        self.inner
    }
}

/// Response of `POST /api/generate`.
///
/// `meals` carries the provider's function-call arguments: parsed JSON when
/// they parse, otherwise the raw string, `null` when the provider made no call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default)]
    pub meals: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings: Option<UserSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GenerateResponse {
    pub fn meal_payload(&self) -> MealPayload {
        MealPayload::from_arguments(&self.meals)
    }
}

/// Typed view over the `meals` field of a [`GenerateResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum MealPayload {
    Parsed(Meal),
    Malformed(String),
    Absent,
}

impl MealPayload {
    pub fn from_arguments(arguments: &Value) -> Self {
        match arguments {
            Value::Null => MealPayload::Absent,
            Value::String(raw) => MealPayload::Malformed(raw.clone()),
            Value::Object(map) => {
                // Providers occasionally drop the `meal` wrapper.
                let candidate = match map.get("meal") {
                    Some(inner @ Value::Object(_)) => inner,
                    Some(_) => return MealPayload::Malformed(arguments.to_string()),
                    None if map.contains_key("name") => arguments,
                    None => return MealPayload::Absent,
                };
                match serde_json::from_value::<Meal>(candidate.clone()) {
                    Ok(meal) => MealPayload::Parsed(meal),
                    Err(_) => MealPayload::Malformed(candidate.to_string()),
                }
            }
            other => MealPayload::Malformed(other.to_string()),
        }
    }

    pub fn into_meal(self) -> Option<Meal> {
        match self {
            MealPayload::Parsed(meal) => Some(meal),
            _ => None,
        }
    }
}

/// Body of `POST /api/generate-image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageRequest {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageResponse {
    pub image: String,
}
