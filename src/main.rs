//! HomeFix CLI
//!
//! Command-line interface for running the problem router.

use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use homefix_router::{
    ApiConfig, ApiServer, AppState, Error, HealthResponse, MetricsConfig, MetricsService, Result,
    ServiceConfig, ServiceContext,
};

#[derive(Parser)]
#[command(name = "homefix")]
#[command(author, version, about = "Household problem router", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },

    /// Start the HTTP API
    Start {
        /// HTTP API listen address (overrides the config file)
        #[arg(long)]
        api_addr: Option<String>,
    },

    /// Seed the configured worker directory from the built-in table
    Seed,

    /// Classify a single problem description and print the result as JSON
    Classify {
        /// Problem description
        query: String,
    },

    /// Check service health
    Health {
        /// API endpoint to check
        #[arg(long, default_value = "http://localhost:8080")]
        endpoint: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: &str) -> Result<ServiceConfig> {
    if Path::new(path).exists() {
        info!("Loading configuration from: {}", path);
        ServiceConfig::load(path)
    } else {
        info!("Using default configuration");
        Ok(ServiceConfig::default())
    }
}

/// Model loading and corpus encoding block, so they run off the runtime.
async fn build_context(config: ServiceConfig) -> Result<Arc<ServiceContext>> {
    let context = tokio::task::spawn_blocking(move || ServiceContext::initialize(config))
        .await
        .map_err(|e| Error::Startup(format!("initialization task failed: {}", e)))??;
    Ok(Arc::new(context))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            info!("Initializing new configuration at: {}", output);
            let config = ServiceConfig::default();
            config.save(&output)?;
            info!("Configuration saved successfully");
        }

        Commands::Start { api_addr } => {
            info!("Starting HomeFix router...");

            let mut config = load_config(&cli.config)?;
            if let Some(addr) = api_addr {
                config.api.listen_address = addr;
            }

            let metrics = Arc::new(MetricsService::new(MetricsConfig::from(&config.metrics)));
            let api_config = ApiConfig::from(&config.api);
            let listen_address = api_config.listen_address.clone();

            let context = build_context(config).await?;
            let state = AppState::new(Arc::clone(&context), metrics);

            info!("API address: {}", listen_address);
            info!("Press Ctrl+C to stop");

            ApiServer::with_state(api_config, state)
                .run(&listen_address)
                .await?;

            context.shutdown().await?;
            info!("Router stopped");
        }

        Commands::Seed => {
            let config = load_config(&cli.config)?;
            let context = build_context(config).await?;

            let report = context.seed().await?;
            if report.seeded {
                info!("Successfully seeded {} workers", report.count);
            } else {
                info!("Workers collection already has data");
            }
            context.shutdown().await?;
        }

        Commands::Classify { query } => {
            let config = load_config(&cli.config)?;
            let context = build_context(config).await?;

            let result = context.classify(&query).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Health { endpoint } => {
            info!("Checking service health at: {}", endpoint);

            let health_url = format!("{}/health", endpoint.trim_end_matches('/'));

            match tokio::time::timeout(std::time::Duration::from_secs(5), check_health(&health_url))
                .await
            {
                Ok(Ok(response)) => {
                    info!("Status: {}", response.status);
                    info!("Version: {}", response.version);
                    info!("Uptime: {} seconds", response.uptime);
                    info!(
                        "Corpus: {} entries, {} categories",
                        response.corpus_entries, response.categories
                    );
                    info!("Directory: {}", response.directory);
                }
                Ok(Err(e)) => {
                    return Err(Error::Api(format!("Health check failed: {}", e)));
                }
                Err(_) => {
                    return Err(Error::Api("Health check timed out".to_string()));
                }
            }
        }
    }

    Ok(())
}

/// Perform a health check against the API endpoint.
async fn check_health(url: &str) -> Result<HealthResponse> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::Api(format!("Connection failed: {}", e)))?
        .error_for_status()
        .map_err(|e| Error::Api(format!("Unhealthy response: {}", e)))?;

    response
        .json()
        .await
        .map_err(|e| Error::Api(format!("JSON parse error: {}", e)))
}
