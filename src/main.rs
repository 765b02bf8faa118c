use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ez_redirect::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "ez-redirect",
    version,
    about = "Live-switchable NFC redirect service with presets and scheduled events",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding config.json and presets.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the redirect server and event scheduler
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port override; the stored port is used otherwise
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between scheduler polls
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Do not run the event scheduler
        #[arg(long, default_value = "false")]
        no_scheduler: bool,

        /// Disable CORS headers
        #[arg(long, default_value = "false")]
        no_cors: bool,
    },

    /// Show the current redirect, presets and schedule
    Status,

    /// Generate a new API key for preset activation URLs
    RotateKey,

    /// Activate a preset and post its cue
    Activate {
        /// Preset name (case and dashes are ignored)
        name: String,
    },

    /// Create today's remote event immediately
    CreateEvent,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(dir) = cli.data_dir.clone() {
        config.storage.data_dir = dir;
    }
    if let Some(format) = cli.log_format.clone() {
        config.logging.format = format;
    }

    // Initialize tracing/logging
    setup_tracing(&config, cli.verbose)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            poll_interval,
            no_scheduler,
            no_cors,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if port.is_some() {
                config.server.port = port;
            }
            if let Some(secs) = poll_interval {
                config.scheduler.poll_interval_secs = secs;
            }
            if no_scheduler {
                config.scheduler.enabled = false;
            }
            if no_cors {
                config.server.enable_cors = false;
            }
            config.validate().context("Invalid configuration")?;

            tracing::info!(
                data_dir = %config.storage.data_dir.display(),
                scheduler = %config.scheduler.enabled,
                "Starting serve command"
            );
            commands::serve(config).await?;
        }

        Commands::Status => commands::status(config)?,

        Commands::RotateKey => commands::rotate_key(config)?,

        Commands::Activate { name } => {
            tracing::info!(preset = %name, "Starting activate command");
            commands::activate(config, name).await?;
        }

        Commands::CreateEvent => commands::create_event(config).await?,
    }

    Ok(())
}

fn setup_tracing(config: &Config, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("ez_redirect=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("ez_redirect={},warn", config.logging.level))
        })
    };

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}
