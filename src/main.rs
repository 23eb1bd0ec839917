//! Command-line front end for the shortener core.
//!
//! Operates the service directly, without an HTTP layer.
//!
//! # Usage
//!
//! ```bash
//! # Create a short URL valid for one day
//! cargo run -- shorten https://example.com --expires-in-hours 24
//!
//! # Resolve a code (and count the click)
//! cargo run -- resolve aaaaab --track
//!
//! # Inspect a code
//! cargo run -- details aaaaab
//! cargo run -- stats aaaaab
//!
//! # Codec helpers
//! cargo run -- encode 1000000
//! cargo run -- decode aaemjc
//!
//! # Check database connection
//! cargo run -- db check
//! ```
//!
//! # Environment Variables
//!
//! See [`short_url::config`]. Without `DATABASE_URL` records live only for
//! the duration of a single command.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use short_url::AppError;
use short_url::bootstrap::{self, App};
use short_url::config;
use short_url::telemetry;
use short_url::utils::codec;

/// CLI tool for the short-url service.
#[derive(Parser)]
#[command(name = "short-url")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Create a short URL
    Shorten {
        /// Absolute URL to shorten
        url: String,

        /// Expire the link after this many hours
        #[arg(short, long)]
        expires_in_hours: Option<i64>,
    },

    /// Resolve a short code to its original URL
    Resolve {
        code: String,

        /// Count this resolution as a click
        #[arg(short, long)]
        track: bool,
    },

    /// Show the stored record, expired or not
    Details { code: String },

    /// Show click statistics
    Stats { code: String },

    /// Record a click
    Click { code: String },

    /// Encode an identifier as a short code
    Encode { id: u64 },

    /// Decode a short code to its identifier
    Decode { code: String },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if run_codec(&cli.command) {
        return Ok(());
    }

    let config = config::load_from_env().context("Invalid configuration")?;
    telemetry::init_tracing(&config.log_level, &config.log_format)?;
    config.print_summary();

    let app = bootstrap::build(&config).await?;
    let result = run(&app, &config.base_url, cli.command).await;
    app.shutdown().await;

    result
}

/// Runs the codec helpers, which need neither configuration nor storage.
///
/// Returns `false` for every other command.
fn run_codec(command: &Commands) -> bool {
    match command {
        Commands::Encode { id } => println!("{}", codec::encode(*id).bright_green()),
        Commands::Decode { code } => match codec::decode(code) {
            Some(id) => println!("{}", id.to_string().bright_green()),
            None => println!("{}", "Invalid short code".red()),
        },
        _ => return false,
    }
    true
}

/// Expiry instant `hours` from now.
fn expiry_after_hours(hours: i64) -> Result<DateTime<Utc>> {
    Duration::try_hours(hours)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .with_context(|| format!("expiry out of range: {} hours", hours))
}

/// Wraps a service error with its kind and structured details.
fn with_details(err: AppError) -> anyhow::Error {
    let summary = match err.details() {
        Value::Object(fields) if !fields.is_empty() => {
            format!("{} {}", err.code(), err.details())
        }
        _ => err.code().to_string(),
    };
    anyhow::Error::new(err).context(summary)
}

/// Dispatches commands that need the wired service.
async fn run(app: &App, base_url: &str, command: Commands) -> Result<()> {
    let service = &app.service;

    match command {
        Commands::Shorten {
            url,
            expires_in_hours,
        } => {
            let expires_at = expires_in_hours.map(expiry_after_hours).transpose()?;
            let view = service
                .create_short_url(url, expires_at)
                .await
                .map_err(with_details)?;

            println!("{}", "Short URL created".bright_blue().bold());
            println!("  Code:     {}", view.short_code.bright_green());
            println!("  Link:     {}", view.absolute_url(base_url));
            println!("  Target:   {}", view.original_url);
            if let Some(expires_at) = view.expires_at {
                println!("  Expires:  {}", expires_at.to_rfc3339());
            }
        }
        Commands::Resolve { code, track } => {
            let url = if track {
                service.resolve_and_track(&code).await
            } else {
                service.get_original_url(&code).await
            }
            .map_err(with_details)?;

            match url {
                Some(url) => println!("{}", url),
                None => println!("{}", "Short code not found or expired".yellow()),
            }
        }
        Commands::Details { code } => match service
            .get_url_details(&code)
            .await
            .map_err(with_details)?
        {
            Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
            None => println!("{}", "Short code not found".yellow()),
        },
        Commands::Stats { code } => match service
            .get_url_stats(&code)
            .await
            .map_err(with_details)?
        {
            Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
            None => println!("{}", "Short code not found".yellow()),
        },
        Commands::Click { code } => {
            service.increment_click_count(&code);
            println!("{}", "Click queued".green());
        }
        Commands::Db {
            action: DbAction::Check,
        } => match &app.pool {
            Some(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .context("Database check failed")?;
                println!("{}", "Database connection OK".green());
            }
            None => println!("{}", "No database configured (in-memory store)".yellow()),
        },
        Commands::Encode { .. } | Commands::Decode { .. } => {
            run_codec(&command);
        }
    }

    Ok(())
}
