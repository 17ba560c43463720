use thiserror::Error;

use super::dto::GenerateRequest;
use super::model::MealType;
use crate::provider::CompletionRequest;

const ROLE_INSTRUCTION: &str = "You are a nutrition assistant. Generate exactly one meal \
that matches the create_meal function schema and return it only through that function. \
Every field is required.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("either userSettings or message is required")]
    MissingIntent,
    #[error("could not serialize {0}: {1}")]
    Serialize(&'static str, #[source] serde_json::Error),
}

/// Turns a generation request into the system and user messages for the provider.
///
/// A chat message takes precedence over settings as the user turn. Settings are
/// then moved into the system context. Existing meals are always listed so the
/// provider avoids repeating a type or can adjust one meal in isolation.
pub fn build_completion(
    req: &GenerateRequest,
    allowed_types: &[MealType],
) -> Result<CompletionRequest, PromptError> {
    let mut system = String::from(ROLE_INSTRUCTION);

    if !req.existing_meals.is_empty() {
        let existing = serde_json::to_string(&req.existing_meals)
            .map_err(|e| PromptError::Serialize("existingMeals", e))?;
        system.push_str(&format!(
            "\n\nThe user already has these meals: {existing}\n\
             Do not generate another meal of a type that already exists unless the user asks \
             to change it. When the user asks to adjust an ingredient, change only that meal \
             and keep its type."
        ));
    }

    let (user, forced) = match (req.instruction(), req.user_settings.as_ref()) {
        (Some(message), settings) => {
            if let Some(s) = settings {
                let profile = serde_json::to_string(s)
                    .map_err(|e| PromptError::Serialize("userSettings", e))?;
                system.push_str(&format!("\n\nUser profile: {profile}"));
            }
            (message.to_string(), false)
        }
        (None, Some(settings)) => {
            let profile = serde_json::to_string(settings)
                .map_err(|e| PromptError::Serialize("userSettings", e))?;
            let target = match req.meal_type {
                Some(t) => format!("a {t} meal"),
                None => "one meal".to_string(),
            };
            (
                format!("Generate {target} for this user profile: {profile}"),
                true,
            )
        }
        (None, None) => return Err(PromptError::MissingIntent),
    };

    let mut meal_types = allowed_types.to_vec();
    if let Some(t) = req.meal_type {
        if !meal_types.contains(&t) {
            meal_types.push(t);
        }
    }

    Ok(CompletionRequest {
        system,
        user,
        meal_types,
        force_function: forced,
    })
}

#[cfg(test)]
mod prompt_tests {
    use super::*;
    use crate::meals::model::{ActivityLevel, Goal, HeightUnit, Meal, UserSettings, WeightUnit};

    fn settings() -> UserSettings {
        UserSettings {
            age: Some(34),
            gender: Some("male".into()),
            weight: Some(80.0),
            weight_unit: WeightUnit::Kg,
            height: Some(180.0),
            height_unit: HeightUnit::Cm,
            activity: Some(ActivityLevel::Active),
            goal: Some(Goal::LoseWeight),
            favourite_foods: None,
            disliked_foods: Some("mushrooms".into()),
            additional_info: None,
        }
    }

    fn lunch() -> Meal {
        Meal {
            id: "l1".into(),
            name: "Chicken Salad".into(),
            ingredients: vec!["chicken".into()],
            instructions: vec!["grill".into()],
            meal_type: MealType::Lunch,
            image: String::new(),
        }
    }

    const DEFAULT_TYPES: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    #[test]
    fn settings_drive_intent_without_message() {
        let s = settings();
        let req = GenerateRequest::builder()
            .settings(Some(&s))
            .meal_type(Some(MealType::Dinner))
            .build();
        let c = build_completion(&req, &DEFAULT_TYPES).unwrap();
        assert!(c.user.starts_with("Generate a dinner meal"));
        assert!(c.user.contains("mushrooms"));
        assert!(c.force_function);
        assert!(!c.system.contains("already has"));
    }

    #[test]
    fn message_takes_precedence_and_settings_move_to_context() {
        let s = settings();
        let req = GenerateRequest::builder()
            .settings(Some(&s))
            .message(Some("swap chicken for tofu"))
            .existing_meals(&[lunch()])
            .build();
        let c = build_completion(&req, &DEFAULT_TYPES).unwrap();
        assert_eq!(c.user, "swap chicken for tofu");
        assert!(!c.force_function);
        assert!(c.system.contains("Chicken Salad"));
        assert!(c.system.contains("User profile"));
    }

    #[test]
    fn missing_intent_is_rejected() {
        let req = GenerateRequest::builder().existing_meals(&[lunch()]).build();
        assert!(matches!(
            build_completion(&req, &DEFAULT_TYPES),
            Err(PromptError::MissingIntent)
        ));
    }

    #[test]
    fn requested_type_extends_schema_enum() {
        let s = settings();
        let req = GenerateRequest::builder()
            .settings(Some(&s))
            .meal_type(Some(MealType::Snack))
            .build();
        let c = build_completion(&req, &DEFAULT_TYPES).unwrap();
        assert_eq!(c.meal_types.last(), Some(&MealType::Snack));
        assert_eq!(c.meal_types.len(), 4);
    }
}
