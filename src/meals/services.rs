use serde_json::Value;
use tracing::{info, warn};

use super::dto::{GenerateRequest, GenerateResponse};
use super::prompt;
use crate::{error::ApiError, state::AppState};

/// Runs one meal generation against the provider.
///
/// Function-call arguments are handed back as JSON when they parse and as the
/// raw string otherwise; a malformed payload is not an error at this layer.
pub async fn generate(st: &AppState, req: GenerateRequest) -> Result<GenerateResponse, ApiError> {
    let completion_req = prompt::build_completion(&req, &st.config.meal_types)?;
    let completion = st.meals.complete(&completion_req).await?;

    let meals = match completion.arguments.as_deref() {
        Some(raw) => parse_arguments(raw),
        None => Value::Null,
    };
    let parsed = !matches!(meals, Value::String(_) | Value::Null);
    info!(
        meal_type = ?req.meal_type,
        chat = req.instruction().is_some(),
        existing = req.existing_meals.len(),
        parsed,
        "meal generated"
    );

    Ok(GenerateResponse {
        success: true,
        meals,
        user_settings: req.user_settings,
        message: completion.content,
    })
}

pub fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "function-call arguments are not valid JSON; passing raw string");
            Value::String(raw.to_string())
        }
    }
}

#[cfg(test)]
mod generate_tests {
    use super::*;
    use crate::meals::dto::MealPayload;
    use crate::meals::model::MealType;
    use crate::provider::Completion;
    use crate::state::fakes::{FakeImageProvider, FakeMealProvider};
    use serde_json::json;

    fn lunch_request() -> GenerateRequest {
        GenerateRequest::builder()
            .message(Some("a light lunch please"))
            .build()
    }

    #[tokio::test]
    async fn parsed_arguments_become_json() {
        let st = AppState::fake();
        let resp = generate(&st, lunch_request()).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.meals["meal"]["mealType"], "lunch");
        let meal = resp.meal_payload().into_meal().unwrap();
        assert_eq!(meal.meal_type, MealType::Lunch);
    }

    #[tokio::test]
    async fn unparsable_arguments_pass_through_raw() {
        let st = AppState::fake_with(
            FakeMealProvider::arguments("{\"meal\": oops"),
            FakeImageProvider::encoded(),
        );
        let resp = generate(&st, lunch_request()).await.unwrap();
        assert_eq!(resp.meals, json!("{\"meal\": oops"));
        assert_eq!(
            resp.meal_payload(),
            MealPayload::Malformed("{\"meal\": oops".into())
        );
    }

    #[tokio::test]
    async fn text_reply_is_forwarded_as_message() {
        let mut provider = FakeMealProvider::arguments("");
        provider.reply = Ok(Completion {
            arguments: None,
            content: Some("Which meal should I change?".into()),
        });
        let st = AppState::fake_with(provider, FakeImageProvider::encoded());
        let resp = generate(&st, lunch_request()).await.unwrap();
        assert_eq!(resp.meals, Value::Null);
        assert_eq!(resp.message.as_deref(), Some("Which meal should I change?"));
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let st = AppState::fake_with(FakeMealProvider::failing(503), FakeImageProvider::encoded());
        let err = generate(&st, lunch_request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Provider(_)));
    }

    #[tokio::test]
    async fn request_without_intent_is_rejected() {
        let st = AppState::fake();
        let err = generate(&st, GenerateRequest::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
