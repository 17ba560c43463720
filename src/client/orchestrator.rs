use std::sync::Arc;

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use tracing::{info, instrument, warn};

use super::backend::MealBackend;
use super::error::GenerationError;
use super::meal_store::MealStore;
use crate::config::ClientConfig;
use crate::meals::dto::{GenerateImageRequest, GenerateRequest, MealPayload};
use crate::meals::model::{Meal, MealType, UserSettings};

/// Result of one generation: the typed payload plus any free-text reply.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub payload: MealPayload,
    pub message: Option<String>,
}

pub type PlanItem = (MealType, Result<Meal, GenerationError>);

#[derive(Debug, Default)]
pub struct PlanReport {
    /// In arrival order.
    pub saved: Vec<Meal>,
    pub failed: Vec<(MealType, GenerationError)>,
}

/// Turns settings or chat input into meals: one generation call, then an
/// optional image call once the meal has parsed.
pub struct MealGenerator {
    backend: Arc<dyn MealBackend>,
    image_generation: bool,
    plan_meal_types: Vec<MealType>,
}

impl MealGenerator {
    pub fn new(
        backend: Arc<dyn MealBackend>,
        image_generation: bool,
        plan_meal_types: Vec<MealType>,
    ) -> Self {
        Self {
            backend,
            image_generation,
            plan_meal_types,
        }
    }

    pub fn from_config(backend: Arc<dyn MealBackend>, config: &ClientConfig) -> Self {
        Self::new(
            backend,
            config.image_generation_enabled,
            config.plan_meal_types.clone(),
        )
    }

    pub fn plan_meal_types(&self) -> &[MealType] {
        &self.plan_meal_types
    }

    #[instrument(skip_all, fields(meal_type = ?meal_type, chat = message.is_some()))]
    pub async fn generate_meal(
        &self,
        settings: Option<&UserSettings>,
        meal_type: Option<MealType>,
        message: Option<&str>,
        existing_meals: &[Meal],
    ) -> Result<GenerationOutcome, GenerationError> {
        let request = GenerateRequest::builder()
            .settings(settings)
            .meal_type(meal_type)
            .message(message)
            .existing_meals(existing_meals)
            .build();
        self.run(&request).await
    }

    async fn run(&self, request: &GenerateRequest) -> Result<GenerationOutcome, GenerationError> {
        let response = self.backend.generate(request).await?;
        if !response.success {
            return Err(GenerationError::Rejected(
                response.message.unwrap_or_default(),
            ));
        }

        let mut payload = response.meal_payload();
        match &mut payload {
            MealPayload::Parsed(meal) => self.attach_image(meal).await,
            MealPayload::Malformed(raw) => {
                warn!(raw = %raw, "meal arguments did not parse; surfacing raw text")
            }
            MealPayload::Absent => {}
        }

        Ok(GenerationOutcome {
            payload,
            message: response.message,
        })
    }

    /// Image failures leave the meal without a picture instead of failing it.
    async fn attach_image(&self, meal: &mut Meal) {
        if !self.image_generation {
            meal.image.clear();
            return;
        }
        let request = GenerateImageRequest {
            name: meal.name.clone(),
            ingredients: meal.ingredients.clone(),
        };
        match self.backend.generate_image(&request).await {
            Ok(resp) => meal.image = resp.image,
            Err(e) => {
                warn!(error = %e, meal = %meal.name, "image generation failed; continuing without image");
                meal.image.clear();
            }
        }
    }

    /// One independent pending generation per plan meal type. Items complete
    /// in whatever order the backend answers; a failure affects only its own item.
    pub fn generate_meal_plan<'a>(
        &'a self,
        settings: &'a UserSettings,
    ) -> FuturesUnordered<BoxFuture<'a, PlanItem>> {
        self.plan_meal_types
            .iter()
            .map(|&meal_type| {
                async move {
                    let result = self
                        .generate_meal(Some(settings), Some(meal_type), None, &[])
                        .await
                        .and_then(|outcome| match outcome.payload {
                            MealPayload::Parsed(meal) => Ok(meal),
                            MealPayload::Malformed(raw) => Err(GenerationError::Malformed(raw)),
                            MealPayload::Absent => Err(GenerationError::NoMeal),
                        });
                    (meal_type, result)
                }
                .boxed()
            })
            .collect()
    }

    /// Drives a meal plan to completion, saving each meal as it arrives.
    pub async fn run_meal_plan(&self, settings: &UserSettings, store: &MealStore) -> PlanReport {
        let mut pending = self.generate_meal_plan(settings);
        let mut report = PlanReport::default();
        while let Some((meal_type, result)) = pending.next().await {
            let saved = result.and_then(|meal| {
                store
                    .save(meal.clone())
                    .map(|_| meal)
                    .map_err(GenerationError::Storage)
            });
            match saved {
                Ok(meal) => {
                    info!(%meal_type, name = %meal.name, "plan meal saved");
                    report.saved.push(meal);
                }
                Err(e) => {
                    warn!(%meal_type, error = %e, "plan meal failed");
                    report.failed.push((meal_type, e));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod orchestrator_tests {
    use super::*;
    use crate::client::kv::MemoryStore;
    use crate::client::testing::{meal_args, settings, Reply, ScriptedBackend};
    use serde_json::json;
    use std::time::Duration;

    fn generator(backend: Arc<ScriptedBackend>, images: bool) -> MealGenerator {
        MealGenerator::new(
            backend,
            images,
            vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner],
        )
    }

    #[tokio::test]
    async fn parsed_meal_gets_image_after_generation() {
        let backend = Arc::new(ScriptedBackend::new(Reply::Args(meal_args("Soup", "dinner"))));
        let g = generator(backend.clone(), true);
        let out = g
            .generate_meal(Some(&settings()), Some(MealType::Dinner), None, &[])
            .await
            .unwrap();
        let MealPayload::Parsed(meal) = out.payload else {
            panic!("expected a meal");
        };
        assert_eq!(meal.image, "https://img.test/Soup.png");
        assert_eq!(*backend.calls.lock(), vec!["generate", "image:Soup"]);
    }

    #[tokio::test]
    async fn image_disabled_means_empty_image_and_no_call() {
        let backend = Arc::new(ScriptedBackend::new(Reply::Args(meal_args("Soup", "dinner"))));
        let g = generator(backend.clone(), false);
        let out = g.generate_meal(Some(&settings()), None, None, &[]).await.unwrap();
        let meal = out.payload.into_meal().unwrap();
        assert_eq!(meal.image, "");
        assert_eq!(*backend.calls.lock(), vec!["generate"]);
    }

    #[tokio::test]
    async fn image_failure_degrades_to_empty_image() {
        let mut backend = ScriptedBackend::new(Reply::Args(meal_args("Soup", "dinner")));
        backend.image_fails = true;
        let g = generator(Arc::new(backend), true);
        let meal = g
            .generate_meal(Some(&settings()), None, None, &[])
            .await
            .unwrap()
            .payload
            .into_meal()
            .unwrap();
        assert_eq!(meal.name, "Soup");
        assert!(!meal.has_image());
    }

    #[tokio::test]
    async fn missing_ingredients_default_to_empty() {
        let args = json!({ "meal": { "name": "Plain Rice", "instructions": ["boil"], "mealType": "lunch" } });
        let backend = Arc::new(ScriptedBackend::new(Reply::Args(args)));
        let meal = generator(backend, false)
            .generate_meal(Some(&settings()), None, None, &[])
            .await
            .unwrap()
            .payload
            .into_meal()
            .unwrap();
        assert!(meal.ingredients.is_empty());
        assert_eq!(meal.instructions, vec!["boil".to_string()]);
        assert!(!meal.id.is_empty());
    }

    #[tokio::test]
    async fn unparsable_arguments_surface_raw_string() {
        let backend = Arc::new(ScriptedBackend::new(Reply::Args(json!("{\"meal\": {"))));
        let out = generator(backend.clone(), true)
            .generate_meal(None, None, Some("hi"), &[])
            .await
            .unwrap();
        assert_eq!(out.payload, MealPayload::Malformed("{\"meal\": {".into()));
        assert_eq!(*backend.calls.lock(), vec!["generate"]);
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let backend = Arc::new(ScriptedBackend::new(Reply::Fail(500)));
        let err = generator(backend, true)
            .generate_meal(Some(&settings()), None, None, &[])
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), crate::client::error::GENERATION_FAILED);
    }

    #[tokio::test]
    async fn request_carries_existing_meals_and_type() {
        let backend = Arc::new(ScriptedBackend::new(Reply::Args(meal_args("Eggs", "breakfast"))));
        let existing = vec![Meal {
            id: "l".into(),
            name: "Salad".into(),
            ingredients: vec![],
            instructions: vec![],
            meal_type: MealType::Lunch,
            image: String::new(),
        }];
        generator(backend.clone(), false)
            .generate_meal(Some(&settings()), Some(MealType::Breakfast), None, &existing)
            .await
            .unwrap();
        let req = backend.requests.lock()[0].clone();
        assert_eq!(req.meal_type, Some(MealType::Breakfast));
        assert_eq!(req.existing_meals, existing);
        assert!(req.message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn plan_failures_are_independent() {
        let mut backend = ScriptedBackend::new(Reply::Fail(500));
        backend.by_type.insert(
            MealType::Breakfast,
            (Reply::Args(meal_args("Oats", "breakfast")), Duration::from_millis(30)),
        );
        backend.by_type.insert(MealType::Lunch, (Reply::Fail(502), Duration::ZERO));
        backend.by_type.insert(
            MealType::Dinner,
            (Reply::Args(meal_args("Stew", "dinner")), Duration::from_millis(5)),
        );
        let g = generator(Arc::new(backend), false);
        let store = MealStore::new(Arc::new(MemoryStore::new()));

        let report = g.run_meal_plan(&settings(), &store).await;

        let names: Vec<_> = report.saved.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Stew", "Oats"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, MealType::Lunch);
        assert_eq!(store.get_all().len(), 2);
    }

    #[tokio::test]
    async fn plan_requests_each_configured_type_once() {
        let backend = Arc::new(ScriptedBackend::new(Reply::Args(meal_args("Any", "lunch"))));
        let g = MealGenerator::new(backend.clone(), false, vec![MealType::Snack, MealType::Dinner]);
        let items: Vec<PlanItem> = g.generate_meal_plan(&settings()).collect().await;
        assert_eq!(items.len(), 2);
        let mut types: Vec<_> = backend
            .requests
            .lock()
            .iter()
            .filter_map(|r| r.meal_type)
            .collect();
        types.sort_by_key(|t| t.as_str());
        assert_eq!(types, vec![MealType::Dinner, MealType::Snack]);
    }

    #[tokio::test]
    async fn plan_treats_missing_meal_as_failure() {
        let backend = Arc::new(ScriptedBackend::new(Reply::Text("no".into())));
        let g = MealGenerator::new(backend, false, vec![MealType::Lunch]);
        let report = g
            .run_meal_plan(&settings(), &MealStore::new(Arc::new(MemoryStore::new())))
            .await;
        assert!(report.saved.is_empty());
        assert!(matches!(report.failed[0].1, GenerationError::NoMeal));
    }
}
