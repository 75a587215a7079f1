//! countdown-notifier: posts a countdown-with-quote message into a group chat.
//!
//! `serve` runs the HTTP trigger, the cron scheduler and the connection
//! watchdog against a messaging bridge. `preview` and `send` are one-off
//! helpers for operators.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use countdown_notifier::daemon::config::ServiceConfig;
use countdown_notifier::daemon::{self, ServiceRunner};
use countdown_notifier::gateway::ChatGateway;
use countdown_notifier::gateway::bridge::BridgeGateway;
use countdown_notifier::notify::NotificationService;
use countdown_notifier::occasion::Occasion;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Countdown notifier: scheduled countdown messages for a group chat.
#[derive(Parser)]
#[command(name = "countdown-notifier", version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(short, long, global = true, default_value = "countdown.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the service (HTTP trigger, scheduler, watchdog) in the foreground.
    Serve,

    /// Print the message that would be sent, without contacting the gateway.
    Preview {
        /// Which occasion to render.
        #[arg(value_enum)]
        occasion: Occasion,

        /// Render as of this date (YYYY-MM-DD) instead of today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Connect and send one message immediately, bypassing the HTTP trigger.
    Send {
        /// Which occasion to send.
        #[arg(value_enum)]
        occasion: Occasion,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::load(&cli.config)?;

    match cli.command {
        Command::Serve => cmd_serve(config).await,
        Command::Preview { occasion, date } => cmd_preview(&config, occasion, date),
        Command::Send { occasion } => cmd_send(config, occasion).await,
    }
}

/// Run the service until SIGINT/SIGTERM.
async fn cmd_serve(config: ServiceConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    daemon::cancel_on_shutdown_signal(cancel.clone());
    ServiceRunner::from_config(config)?.run(cancel).await
}

/// Render and print a message.
fn cmd_preview(config: &ServiceConfig, occasion: Occasion, date: Option<NaiveDate>) -> Result<()> {
    let settings = daemon::dispatch_settings(config)?;
    let now = match date {
        Some(d) => d
            .and_hms_opt(12, 0, 0)
            .and_then(|noon| noon.and_local_timezone(settings.zone).single())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| eyre!("{d} has no unambiguous noon in {}", settings.zone))?,
        None => Utc::now(),
    };

    let text = settings.compose(occasion, now, &mut rand::thread_rng())?;
    println!("{text}");
    Ok(())
}

/// Connect, dispatch once, disconnect.
async fn cmd_send(config: ServiceConfig, occasion: Occasion) -> Result<()> {
    let gateway = Arc::new(BridgeGateway::new(&config.gateway)?);
    gateway
        .connect()
        .await
        .wrap_err("failed to connect to the chat gateway")?;

    let service = NotificationService::new(gateway.clone(), daemon::dispatch_settings(&config)?);
    let result = service.dispatch(occasion).await;
    gateway.disconnect().await;

    result.wrap_err_with(|| format!("failed to send {occasion} message"))?;
    println!("Sent {occasion} message.");
    Ok(())
}
