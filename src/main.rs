use clap::{Parser, Subcommand};

use dietgen::{
    app,
    cli::{self, ClientContext, SettingsArgs},
    meals::model::MealType,
    state::AppState,
};

#[derive(Parser)]
#[command(name = "dietgen", about = "AI meal suggestions with a local meal plan")]
struct Cli {
    /// Call the providers in process instead of going through the HTTP API
    #[arg(long, global = true)]
    local: bool,

    /// Skip image generation for this run
    #[arg(long, global = true)]
    no_images: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Manage saved user settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Generate a meal plan from the saved settings
    Plan,
    /// Generate a single meal
    Generate {
        /// Meal type to ask for
        #[arg(long = "type")]
        meal_type: Option<MealType>,
        /// Free-text instruction; takes precedence over settings
        #[arg(long)]
        message: Option<String>,
    },
    /// Refine meals interactively
    Chat,
    /// List current meals
    Meals,
    /// Remove all current meals
    Clear,
}

#[derive(Subcommand)]
enum SettingsCommands {
    Show,
    Set(SettingsArgs),
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "dietgen=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let state = AppState::init().await?;
            app::serve(app::build_app(state)).await
        }
        command => {
            let ctx = ClientContext::init(cli.local, cli.no_images).await?;
            run_client(&ctx, command).await
        }
    }
}

async fn run_client(ctx: &ClientContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve => anyhow::bail!("serve does not use the local client"),
        Commands::Settings { command } => match command {
            SettingsCommands::Show => cli::show_settings(ctx),
            SettingsCommands::Set(args) => cli::set_settings(ctx, args),
            SettingsCommands::Clear => cli::clear_settings(ctx),
        },
        Commands::Plan => cli::plan(ctx).await,
        Commands::Generate { meal_type, message } => {
            cli::generate(ctx, meal_type, message.as_deref()).await
        }
        Commands::Chat => cli::chat(ctx).await,
        Commands::Meals => cli::list_meals(ctx),
        Commands::Clear => cli::clear_meals(ctx),
    }
}
