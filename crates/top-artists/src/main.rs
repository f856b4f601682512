use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use top_artists::config::AppConfig;
use top_artists::lastfm::LastFmClient;
use top_artists::processor::process_data;
use top_artists::render::update_ui;
use top_artists::storage::HistoryStore;

#[derive(Parser)]
#[command(name = "top-artists")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monthly Last.fm top artists with stable chart colors", long_about = None)]
struct Cli {
    /// TOML config file (defaults to ./top-artists.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Fetch this month's chart, save it to the history and rebuild the site (default)
    Run,
    /// Rebuild the site from the saved history without fetching
    Render,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Render => render(&config),
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    let (api_key, user) = config.credentials()?;
    let palette = config.palette()?;

    let client = LastFmClient::new(api_key, user)?;
    let payload = client
        .fetch_top_artists(config.period, config.limit, 1)
        .await?;

    let snapshot = process_data(&payload, Utc::now());
    info!(
        month = %snapshot.month_key,
        artists = snapshot.artists.len(),
        "Processed top artists"
    );

    let history = HistoryStore::new(&config.history_path).save(&snapshot)?;
    update_ui(&history, &config.output_dir, &palette)?;

    info!("UI updated successfully.");
    Ok(())
}

fn render(config: &AppConfig) -> Result<()> {
    let palette = config.palette()?;
    let history = HistoryStore::new(&config.history_path).load()?;
    let html_path = update_ui(&history, &config.output_dir, &palette)?;

    info!(months = history.len(), html = %html_path.display(), "Site rebuilt");
    Ok(())
}
