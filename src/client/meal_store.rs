use std::sync::Arc;

use tracing::{debug, error};

use super::kv::KeyValueStore;
use super::subject::{Subject, SubscriptionId};
use crate::meals::model::Meal;

pub const SAVED_MEALS_KEY: &str = "dietgen-saved-meal-plans";

/// Current meals, at most one per meal type, newest first.
///
/// Durable storage is the source of truth; every write publishes the full
/// collection to subscribers.
pub struct MealStore {
    kv: Arc<dyn KeyValueStore>,
    meals: Subject<Vec<Meal>>,
}

impl MealStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let initial = read_meals(kv.as_ref());
        Self {
            kv,
            meals: Subject::new(initial),
        }
    }

    /// Never fails: unreadable state is logged and reported as empty.
    pub fn get_all(&self) -> Vec<Meal> {
        read_meals(self.kv.as_ref())
    }

    /// Evicts any meal of the same type, puts `meal` first, persists and publishes.
    /// Each call is its own read-modify-write of the whole collection.
    pub fn save(&self, meal: Meal) -> anyhow::Result<Vec<Meal>> {
        let mut meals = self.get_all();
        meals.retain(|m| m.meal_type != meal.meal_type);
        debug!(id = %meal.id, meal_type = %meal.meal_type, "saving meal");
        meals.insert(0, meal);
        self.kv
            .set(SAVED_MEALS_KEY, &serde_json::to_string(&meals)?)?;
        self.meals.publish(meals.clone());
        Ok(meals)
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.kv.remove(SAVED_MEALS_KEY)?;
        self.meals.publish(Vec::new());
        Ok(())
    }

    /// The listener is called right away with the latest published collection.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Vec<Meal>) + Send + Sync + 'static,
    {
        self.meals.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.meals.unsubscribe(id)
    }
}

fn read_meals(kv: &dyn KeyValueStore) -> Vec<Meal> {
    let Some(saved) = kv.get(SAVED_MEALS_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Meal>>(&saved) {
        Ok(meals) => meals,
        Err(e) => {
            error!(error = %e, "error parsing saved meals");
            Vec::new()
        }
    }
}
