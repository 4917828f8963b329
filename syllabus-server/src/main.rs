//! # Syllabus Server
//!
//! REST API for an e-learning catalog: categories, subcategories, courses
//! and their chapters, sections and media, plus geographic reference data
//! and users with creator profiles.
//!
//! The server is built on Axum and uses PostgreSQL for persistent storage,
//! with migrations embedded in `syllabus-core`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use syllabus_config::{Config, ConfigLoad, ConfigLoader, ConfigWarnings, redact_database_url};
use syllabus_core::database::{PoolSettings, PostgresDatabase};
use syllabus_server::{AppState, create_app};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "syllabus-server")]
#[command(about = "REST API for the Syllabus e-learning catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "SYLLABUS_CONFIG")]
    config: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Load and validate configuration, print the effective values and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Command::Db(DbCommand::Migrate) => {
                run_db_migrate(&cli.serve).await?;
                return Ok(());
            }
            Command::Config(ConfigCommand::Check) => {
                run_config_check(&cli.serve)?;
                return Ok(());
            }
        }
    }

    run_server(cli.serve).await
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<(Config, ConfigWarnings)> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    Ok((config, warnings))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Override via RUST_LOG.
                "syllabus_server=info,syllabus_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_warnings(warnings: &ConfigWarnings) {
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }
}

fn pool_settings(config: &Config) -> PoolSettings {
    PoolSettings {
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        acquire_timeout: config.database.acquire_timeout,
    }
}

fn database_url(config: &Config) -> anyhow::Result<&str> {
    match config.database.url.as_deref() {
        Some(url) => Ok(url),
        None => bail!("DATABASE_URL is not set and no database.url is configured"),
    }
}

async fn connect(config: &Config) -> anyhow::Result<PostgresDatabase> {
    let url = database_url(config)?;
    info!(database = %redact_database_url(url), "connecting to PostgreSQL");
    PostgresDatabase::connect(url, pool_settings(config))
        .await
        .context("failed to connect to PostgreSQL")
}

async fn run_db_migrate(args: &ServeArgs) -> anyhow::Result<()> {
    let (config, warnings) = load_runtime_config(args)?;
    init_tracing();
    log_warnings(&warnings);

    let db = connect(&config).await?;
    db.initialize_schema()
        .await
        .context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

fn run_config_check(args: &ServeArgs) -> anyhow::Result<()> {
    let (config, warnings) = load_runtime_config(args)?;

    println!("bind address:      {}", config.bind_address());
    match &config.metadata.config_path {
        Some(path) => println!("config file:       {}", path.display()),
        None => println!("config file:       <none>"),
    }
    println!("env file loaded:   {}", config.metadata.env_file_loaded);
    println!(
        "database url:      {}",
        config
            .database
            .url
            .as_deref()
            .map(redact_database_url)
            .unwrap_or_else(|| "<unset>".to_string())
    );
    println!(
        "database pool:     min {} / max {}, acquire timeout {:?}",
        config.database.min_connections,
        config.database.max_connections,
        config.database.acquire_timeout
    );
    println!("run migrations:    {}", config.database.run_migrations);
    println!(
        "cors origins:      {}",
        if config.cors.allows_any_origin() {
            "*".to_string()
        } else {
            config.cors.allowed_origins.join(", ")
        }
    );
    println!(
        "country cache:     ttl {:?}, capacity {}",
        config.cache.country_ttl, config.cache.country_capacity
    );

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => println!("warning: {} ({hint})", warning.message),
            None => println!("warning: {}", warning.message),
        }
    }
    Ok(())
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let (config, warnings) = load_runtime_config(&args)?;
    init_tracing();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }
    log_warnings(&warnings);

    let db = connect(&config).await?;
    if config.database.run_migrations {
        db.initialize_schema()
            .await
            .context("database migration failed")?;
        info!("Database migrations applied");
    }

    info!(
        cache.country_ttl_secs = config.cache.country_ttl.as_secs(),
        cache.country_capacity = config.cache.country_capacity,
        cache.enabled = config.cache.country_cache_enabled(),
        "country cache configuration in effect"
    );

    let addr = config.bind_address();
    let state = AppState::new(Arc::new(db), Arc::new(config));
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "syllabus server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
