//! Command-line interface using clap's derive macros.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{AppConfig, ConfigLoader};
use crate::db;
use crate::error::TrackingError;
use crate::repositories::WebsiteRepository;
use crate::server::{AppState, run_server};
use crate::signatures::SignatureCatalog;
use crate::snippet::tracking_code;
use crate::telemetry;
use crate::trap;

/// botwatch - records AI crawler visits to registered websites
#[derive(Debug, Parser)]
#[command(name = "botwatch")]
#[command(version)]
#[command(about = "Detects AI crawlers on registered websites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Register a website and print its credentials and tracking code
    Register {
        /// Display name; the website id is derived from it
        #[arg(long)]
        name: String,

        /// Public http(s) URL of the site
        #[arg(long)]
        url: String,
    },

    /// Print the active signature catalog in match order
    Signatures,
}

/// Loads configuration, initialises telemetry and dispatches the command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    telemetry::init_tracing(&config).context("Failed to initialise telemetry")?;

    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Loaded configuration");
    }

    let catalog = SignatureCatalog::load_or_default(config.signatures_path.as_deref())
        .context("Failed to load signature catalog")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, catalog).await,
        Commands::Migrate => {
            let db = db::init_pool(&config).await?;
            db::run_migrations(&db).await
        }
        Commands::Register { name, url } => register(&config, &name, &url).await,
        Commands::Signatures => {
            for signature in catalog.iter() {
                println!("{}\t{}", signature.token, signature.name);
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, catalog: SignatureCatalog) -> Result<()> {
    tracing::info!(
        profile = %config.profile,
        signatures = catalog.len(),
        pixel_user_agent_source = %config.pixel_user_agent_source,
        "Starting botwatch"
    );

    let db = db::init_pool(&config).await?;
    db::run_migrations(&db).await?;

    let state = AppState::new(config, db, catalog);
    trap::ensure_trap_target(&state).await?;

    run_server(state).await
}

async fn register(config: &AppConfig, name: &str, url: &str) -> Result<()> {
    if !config.registry_enabled() {
        return Err(TrackingError::RegistryDisabled.into());
    }

    let db = db::init_pool(config).await?;
    db::run_migrations(&db).await?;

    let registered = WebsiteRepository::new(std::sync::Arc::new(db))
        .register(name, url)
        .await
        .context("Failed to register website")?;

    println!("website_id: {}", registered.website.id);
    println!("api_key:    {}", registered.api_key);
    println!();
    println!(
        "{}",
        tracking_code(
            &config.analytics_url,
            &registered.website.id,
            &registered.api_key
        )
    );
    Ok(())
}
