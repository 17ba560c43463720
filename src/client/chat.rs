use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::error::GenerationError;
use super::meal_store::MealStore;
use super::orchestrator::MealGenerator;
use super::settings_store::UserSettingsStore;
use crate::meals::dto::MealPayload;
use crate::meals::model::Meal;

pub const FALLBACK_REPLY: &str = "Okay!";
pub const ERROR_REPLY: &str = "Sorry, there was an error.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// A meal came back and was written to the store.
    MealUpdated(Meal),
    Message(String),
    Acknowledged,
}

impl ChatOutcome {
    pub fn reply(&self) -> String {
        match self {
            ChatOutcome::MealUpdated(meal) => format!("Meal updated: {}", meal.name),
            ChatOutcome::Message(text) => text.clone(),
            ChatOutcome::Acknowledged => FALLBACK_REPLY.to_string(),
        }
    }
}

/// Sends chat messages as follow-up generations and folds meals back into the store.
pub struct ChatService {
    generator: Arc<MealGenerator>,
    meals: Arc<MealStore>,
    settings: Arc<UserSettingsStore>,
}

impl ChatService {
    pub fn new(
        generator: Arc<MealGenerator>,
        meals: Arc<MealStore>,
        settings: Arc<UserSettingsStore>,
    ) -> Self {
        Self {
            generator,
            meals,
            settings,
        }
    }

    #[instrument(skip_all, fields(existing = existing_meals.len()))]
    pub async fn send_chat_message(
        &self,
        text: &str,
        existing_meals: &[Meal],
    ) -> Result<ChatOutcome, GenerationError> {
        let settings = self.settings.get();
        let outcome = self
            .generator
            .generate_meal(settings.as_ref(), None, Some(text), existing_meals)
            .await?;

        match outcome.payload {
            MealPayload::Parsed(meal) => {
                self.meals
                    .save(meal.clone())
                    .map_err(GenerationError::Storage)?;
                info!(name = %meal.name, meal_type = %meal.meal_type, "meal updated from chat");
                Ok(ChatOutcome::MealUpdated(meal))
            }
            MealPayload::Malformed(_) | MealPayload::Absent => Ok(outcome
                .message
                .filter(|m| !m.trim().is_empty())
                .map(ChatOutcome::Message)
                .unwrap_or(ChatOutcome::Acknowledged)),
        }
    }
}

/// Transcript of one chat session. Nothing here is persisted.
pub struct ChatSession {
    service: ChatService,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(service: ChatService) -> Self {
        Self {
            service,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Records the user message, asks for a refinement and records the reply.
    /// Blank input is ignored. Errors become an apology; the user message stays.
    pub async fn send(&mut self, input: &str) -> Option<&ChatMessage> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: text.to_string(),
        });

        let existing = self.service.meals.get_all();
        let reply = match self.service.send_chat_message(text, &existing).await {
            Ok(outcome) => outcome.reply(),
            Err(e) => {
                error!(error = %e, "error sending chat message");
                ERROR_REPLY.to_string()
            }
        };
        self.messages.push(ChatMessage {
            role: ChatRole::Bot,
            content: reply,
        });
        self.messages.last()
    }
}
