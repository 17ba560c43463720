//! Command handlers for the local client: settings, plans, single meals and chat.

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::client::{
    backend::{HttpBackend, InProcessBackend, MealBackend},
    chat::{ChatService, ChatSession},
    kv::{FileStore, KeyValueStore},
    meal_store::MealStore,
    orchestrator::MealGenerator,
    settings_store::UserSettingsStore,
};
use crate::config::ClientConfig;
use crate::meals::dto::MealPayload;
use crate::meals::model::{ActivityLevel, Goal, HeightUnit, Meal, MealType, UserSettings, WeightUnit};
use crate::state::AppState;

pub struct ClientContext {
    pub meals: Arc<MealStore>,
    pub settings: Arc<UserSettingsStore>,
    pub generator: Arc<MealGenerator>,
}

impl ClientContext {
    pub async fn init(local: bool, no_images: bool) -> anyhow::Result<Self> {
        let mut config = ClientConfig::from_env()?;
        if no_images {
            config.image_generation_enabled = false;
        }
        let backend: Arc<dyn MealBackend> = if local {
            Arc::new(InProcessBackend::new(AppState::init().await?))
        } else {
            Arc::new(HttpBackend::new(config.api_url.clone()))
        };
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.state_file));
        tracing::debug!(
            state_file = %config.state_file.display(),
            images = config.image_generation_enabled,
            local,
            "client initialised"
        );
        Ok(Self::new(kv, backend, &config))
    }

    pub fn new(kv: Arc<dyn KeyValueStore>, backend: Arc<dyn MealBackend>, config: &ClientConfig) -> Self {
        Self {
            meals: Arc::new(MealStore::new(kv.clone())),
            settings: Arc::new(UserSettingsStore::new(kv)),
            generator: Arc::new(MealGenerator::from_config(backend, config)),
        }
    }

    fn require_settings(&self) -> anyhow::Result<UserSettings> {
        self.settings
            .get()
            .context("no saved user settings; run `dietgen settings set` first")
    }
}

fn parse_serde<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|e| e.to_string())
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[arg(long, value_parser = clap::value_parser!(u32).range(13..=120))]
    pub age: u32,
    #[arg(long)]
    pub gender: String,
    #[arg(long)]
    pub weight: f64,
    /// kg or lbs
    #[arg(long, default_value = "kg", value_parser = parse_serde::<WeightUnit>)]
    pub weight_unit: WeightUnit,
    #[arg(long)]
    pub height: f64,
    /// cm or in
    #[arg(long, default_value = "cm", value_parser = parse_serde::<HeightUnit>)]
    pub height_unit: HeightUnit,
    /// Sedentary, Moderate or Active
    #[arg(long, value_parser = parse_serde::<ActivityLevel>)]
    pub activity: ActivityLevel,
    /// "lose weight", "maintain weight", "gain weight" or "build muscle"
    #[arg(long, value_parser = parse_serde::<Goal>)]
    pub goal: Goal,
    #[arg(long)]
    pub favourite_foods: Option<String>,
    #[arg(long)]
    pub disliked_foods: Option<String>,
    #[arg(long)]
    pub additional_info: Option<String>,
}

impl From<SettingsArgs> for UserSettings {
    fn from(a: SettingsArgs) -> Self {
        UserSettings {
            age: Some(a.age),
            gender: Some(a.gender),
            weight: Some(a.weight),
            weight_unit: a.weight_unit,
            height: Some(a.height),
            height_unit: a.height_unit,
            activity: Some(a.activity),
            goal: Some(a.goal),
            favourite_foods: a.favourite_foods,
            disliked_foods: a.disliked_foods,
            additional_info: a.additional_info,
        }
    }
}

pub fn show_settings(ctx: &ClientContext) -> anyhow::Result<()> {
    match ctx.settings.get() {
        Some(s) => println!("{}", serde_json::to_string_pretty(&s)?),
        None => println!("no saved settings"),
    }
    Ok(())
}

pub fn set_settings(ctx: &ClientContext, args: SettingsArgs) -> anyhow::Result<()> {
    ctx.settings.save(args.into())?;
    println!("settings saved");
    Ok(())
}

pub fn clear_settings(ctx: &ClientContext) -> anyhow::Result<()> {
    ctx.settings.clear()?;
    println!("settings cleared");
    Ok(())
}

pub async fn plan(ctx: &ClientContext) -> anyhow::Result<()> {
    let settings = ctx.require_settings()?;
    let report = ctx.generator.run_meal_plan(&settings, &ctx.meals).await;
    for meal in &report.saved {
        print_meal(meal);
    }
    for (meal_type, e) in &report.failed {
        eprintln!("{meal_type}: {} ({e})", e.user_message());
    }
    anyhow::ensure!(!report.saved.is_empty(), "no meal could be generated");
    Ok(())
}

pub async fn generate(
    ctx: &ClientContext,
    meal_type: Option<MealType>,
    message: Option<&str>,
) -> anyhow::Result<()> {
    let settings = ctx.settings.get();
    anyhow::ensure!(
        settings.is_some() || message.is_some(),
        "save settings first or pass --message"
    );
    let existing = ctx.meals.get_all();
    let outcome = ctx
        .generator
        .generate_meal(settings.as_ref(), meal_type, message, &existing)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({e})", e.user_message()))?;

    match outcome.payload {
        MealPayload::Parsed(meal) => {
            ctx.meals.save(meal.clone())?;
            print_meal(&meal);
        }
        MealPayload::Malformed(raw) => println!("{raw}"),
        MealPayload::Absent => {
            println!("{}", outcome.message.unwrap_or_else(|| "no meal returned".into()))
        }
    }
    Ok(())
}

pub async fn chat(ctx: &ClientContext) -> anyhow::Result<()> {
    let service = ChatService::new(ctx.generator.clone(), ctx.meals.clone(), ctx.settings.clone());
    let mut session = ChatSession::new(service);
    let sub = ctx.meals.subscribe(|meals| {
        tracing::debug!(count = meals.len(), "meal list changed");
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    println!("Ask for changes to your meals. /meals lists them, /quit exits.");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/meals" => {
                ctx.meals.get_all().iter().for_each(print_meal);
                continue;
            }
            _ => {}
        }
        if let Some(reply) = session.send(&line).await {
            println!("{}", reply.content);
        }
    }
    ctx.meals.unsubscribe(sub);
    Ok(())
}

pub fn list_meals(ctx: &ClientContext) -> anyhow::Result<()> {
    let meals = ctx.meals.get_all();
    if meals.is_empty() {
        println!("no meals yet");
    }
    meals.iter().for_each(print_meal);
    Ok(())
}

pub fn clear_meals(ctx: &ClientContext) -> anyhow::Result<()> {
    ctx.meals.clear()?;
    println!("meals cleared");
    Ok(())
}

fn print_meal(meal: &Meal) {
    println!("[{}] {}", meal.meal_type, meal.name);
    for i in &meal.ingredients {
        println!("  - {i}");
    }
    for (n, step) in meal.instructions.iter().enumerate() {
        println!("  {}. {step}", n + 1);
    }
    if meal.has_image() {
        println!("  image: {}", meal.image);
    }
}
