//! Pressure Diary daemon
//!
//! `run` starts the minute-aligned reminder scheduler and serves a
//! line-oriented console transport on stdin (`<chat_id> <text>` per line) -
//! a real chat transport plugs in through the `ChatSender` trait and a call
//! to `BotService::handle_message` per received message.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pressure_diary::config::Config;
use pressure_diary::locate::OpenMeteoGeocoder;
use pressure_diary::scheduler::Scheduler;
use pressure_diary::service::BotService;
use pressure_diary::store::JsonStore;
use pressure_diary::transport::ConsoleSender;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Blood-pressure diary bot daemon
#[derive(Parser)]
#[command(name = "pressure-diary")]
#[command(about = "Blood-pressure diary bot - state machine and reminder scheduler")]
struct Cli {
    /// Store file path (defaults to $DB_PATH; in-memory when unset)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon with a console transport on stdin
    Run,

    /// Execute a single scheduler pass and exit
    Tick,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::default();
    if cli.db.is_some() {
        config.store_path = cli.db;
    }

    let store: Arc<JsonStore> = match &config.store_path {
        Some(path) => {
            info!(path = %path.display(), "opening store");
            Arc::new(JsonStore::open(path).context("failed to open store")?)
        }
        None => {
            info!("no store path configured, keeping records in memory");
            Arc::new(JsonStore::in_memory())
        }
    };
    info!(users = store.len(), "store loaded");

    let resolver =
        Arc::new(OpenMeteoGeocoder::new(&config.geocoder_url).context("failed to build geocoder")?);
    let sender = Arc::new(ConsoleSender);
    let service = Arc::new(BotService::new(store.clone(), sender, resolver));
    let scheduler = Scheduler::new(service.clone(), store.clone());

    match cli.command {
        Commands::Tick => {
            scheduler.tick(chrono::Utc::now());
            Ok(())
        }
        Commands::Run => {
            scheduler.spawn();
            info!("scheduler started, reading messages from stdin");

            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("failed to read stdin")?;
                let Some((chat_id, text)) = parse_line(&line) else {
                    warn!(line = %line, "ignoring malformed input line");
                    continue;
                };
                service.handle_message(chat_id, text);
            }

            info!("stdin closed, shutting down");
            Ok(())
        }
    }
}

/// Split `<chat_id> <text>` input lines.
fn parse_line(line: &str) -> Option<(i64, &str)> {
    let line = line.trim();
    let (id, text) = line.split_once(char::is_whitespace)?;
    let chat_id = id.parse().ok()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some((chat_id, text))
}
