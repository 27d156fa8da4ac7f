//! dm-side command line
//!
//! Runs the comment overlay against a fetched watch page, printing to the
//! terminal instead of a browser panel.

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use tokio::sync::mpsc;
use tracing::{error, info};

use dm_side::data::format_time;
use dm_side::headless::{FetchedPage, SimulatedVideo, StaticScanner, TerminalView};
use dm_side::loader::CommentLoader;
use dm_side::logging::{get_log_dir, init_logging};
use dm_side::net::{Endpoints, HttpClient, ReqwestClient};
use dm_side::playback::{PlaybackSource, SharedSource, SourceId};
use dm_side::resolver::Resolver;
use dm_side::view::SharedView;
use dm_side::{Config, Overlay};

#[derive(Parser)]
#[command(version, about = "Comment timeline side panel for bilibili videos")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the comment channel id of a watch page
    Resolve { url: Url },
    /// Print a watch page's comments in time order
    Comments {
        url: Url,
        /// Print at most this many comments
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Follow a simulated playback of a watch page, printing each comment as
    /// it becomes current
    Play {
        url: Url,
        /// Start position in seconds
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        /// Playback speed
        #[arg(long, default_value_t = 1.0)]
        rate: f64,
        /// Panel height in rows
        #[arg(long, default_value_t = 20)]
        viewport: usize,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging()?;
    info!("Logging to {:?}", get_log_dir().ok());

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded from {:?}", config.config_path().ok());

    let runtime = tokio::runtime::Runtime::new()?;
    let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(&config.endpoints)?);

    runtime.block_on(async move {
        match cli.command {
            Commands::Resolve { url } => resolve(config, client, url).await,
            Commands::Comments { url, limit } => comments(config, client, url, limit).await,
            Commands::Play {
                url,
                from,
                rate,
                viewport,
            } => play(config, client, url, from, rate, viewport).await,
        }
    })
}

async fn fetch_page(client: &Arc<dyn HttpClient>, url: Url) -> Result<FetchedPage> {
    FetchedPage::fetch(client.as_ref(), url.clone())
        .await
        .with_context(|| format!("Failed to fetch {}", url))
}

async fn resolve(config: Config, client: Arc<dyn HttpClient>, url: Url) -> Result<ExitCode> {
    let page = fetch_page(&client, url).await?;
    let endpoints = Endpoints::from_config(&config.endpoints)?;
    let resolver = Resolver::new(client, endpoints, &config.resolver);

    match resolver.resolve(&page).await {
        Ok(cid) => {
            println!("{}", cid);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn comments(
    config: Config,
    client: Arc<dyn HttpClient>,
    url: Url,
    limit: Option<usize>,
) -> Result<ExitCode> {
    let page = fetch_page(&client, url.clone()).await?;
    let endpoints = Endpoints::from_config(&config.endpoints)?;
    let resolver = Resolver::new(client.clone(), endpoints.clone(), &config.resolver);

    let cid = match resolver.resolve(&page).await {
        Ok(cid) => cid,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let loader = CommentLoader::new(client, endpoints);
    let timeline = loader
        .load(&cid, Some(url))
        .await
        .with_context(|| format!("Failed to load comments for {}", cid))?;

    let limit = limit.unwrap_or(usize::MAX);
    for entry in timeline.entries().iter().take(limit) {
        println!("{}  {}", format_time(entry.time), entry.text);
    }
    Ok(ExitCode::SUCCESS)
}

async fn play(
    config: Config,
    client: Arc<dyn HttpClient>,
    url: Url,
    from: f64,
    rate: f64,
    viewport: usize,
) -> Result<ExitCode> {
    let page = fetch_page(&client, url).await?;

    let video = Arc::new(SimulatedVideo::new(SourceId(1), 0.0).with_rate(rate));
    video.seek(from);
    let scanner = Arc::new(StaticScanner::new(vec![video.clone() as SharedSource]));
    let view: SharedView = Arc::new(Mutex::new(TerminalView::stdout(viewport)));

    let mut overlay = Overlay::new(config, client, view)?;
    let status = overlay.initialize(&page, scanner).await;
    if !status.is_ready() {
        return Ok(ExitCode::FAILURE);
    }

    // Ctrl+C tears the session down
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        let _ = shutdown_tx.try_send(());
    })
    .context("Failed to install Ctrl+C handler")?;

    info!("Playing from {} at {}x", format_time(from), rate);
    video.play();
    shutdown_rx.recv().await;

    if video.is_playing() {
        video.pause();
    }
    info!("Stopped at {}", format_time(video.current_time()));
    overlay.teardown().await;
    info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}
