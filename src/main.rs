use anyhow::{Context, Result};
use clap::Parser;
use seloger_scout::config::{Config, FetchMode};
use seloger_scout::scrapers::{BrowserFetcher, HttpFetcher, PageFetcher, SeLogerScraper};
use seloger_scout::{delta, outputs};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// SeLoger listing scraper (by search URL)
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to JSON configuration file
    #[arg(short, long, default_value = "config/settings.example.json")]
    config: PathBuf,

    /// Output file; the config's `output_path` takes precedence
    #[arg(short, long, default_value = "data/output.json")]
    output: PathBuf,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config).await.context("Unable to load configuration")?;

    let start_url = config
        .resolve_start_url()
        .await
        .context("No start_url provided in config and no valid URL in inputs file")?;

    let output_path = config.output_path.clone().unwrap_or(cli.output);
    let previous_path = config.previous_output_path.clone().unwrap_or_else(|| output_path.clone());

    let fetcher: Arc<dyn PageFetcher> = match config.fetch_mode {
        FetchMode::Http => Arc::new(HttpFetcher::new(config.user_agent.as_deref(), config.fetch_timeout())?),
        FetchMode::Browser => Arc::new(BrowserFetcher::new(config.max_workers)?),
    };

    let scraper = SeLogerScraper::new(fetcher, config.site(), config.max_workers, config.fetch_timeout())?;

    info!(
        "Starting scrape for {} (deep_scrape={}, delta_mode={})",
        start_url, config.deep_scrape, config.delta_mode
    );

    let listings = match scraper.scrape(&start_url, config.deep_scrape, config.max_results).await {
        Ok(listings) => listings,
        Err(e) => {
            error!("Scraping failed: {}", e);
            return Err(e.into());
        }
    };

    let payload = if config.delta_mode {
        let previous = delta::load_previous(&previous_path).await;
        let deltas = delta::compute_delta(&previous, &listings);
        info!(
            "Delta summary - total current: {}, new: {}, removed: {}",
            deltas.current.len(),
            deltas.new.len(),
            deltas.removed.len()
        );
        for record in &deltas.new {
            println!("+ {} {}", record.title, record.url);
        }
        for record in &deltas.removed {
            println!("- {} {}", record.title, record.url);
        }
        deltas.current
    } else {
        listings
    };

    outputs::export_listings(&payload, &output_path, config.output_format)
        .await
        .context("Failed to export listings")?;

    println!(
        "Scraping complete. {} listings exported to {} as {}.",
        payload.len(),
        output_path.display(),
        config.output_format
    );

    Ok(())
}
