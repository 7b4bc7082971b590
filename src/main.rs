mod config;
mod database;
mod evaluator;
mod extract;
mod http_client;
mod models;
mod notifier;
mod poller;
mod scraper_trait;
mod scrapers;
mod tracker;

use anyhow::Result;
use clap::Parser;
use config::{CacheBackend, Config, DEFAULT_CONFIG_PATH};
use database::SqliteSeenStore;
use evaluator::Criteria;
use http_client::Fetcher;
use notifier::NtfyNotifier;
use poller::Poller;
use scraper_trait::{Scraper, ScraperRegistry};
use scrapers::{KamernetScraper, ParariusScraper};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracker::{FileSeenStore, SeenStore};

#[derive(Parser, Debug)]
#[command(name = "rentwatch")]
#[command(about = "Watches rental sites and pushes a notification for every new matching listing", long_about = None)]
struct Args {
    /// Path to the YAML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Run a single polling cycle and exit
    #[arg(long)]
    once: bool,

    /// Test URL fetching - fetch and print HTML from a URL
    #[arg(long)]
    test_url: Option<String>,

    /// Test a specific scraper with configured cities (no notifications, nothing persisted)
    #[arg(long)]
    test_scraper: Option<String>,

    /// Save HTML to file when using --test-url
    #[arg(long)]
    save_html: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create config first (before logging is initialized)
    if !std::path::Path::new(&args.config).exists() {
        eprintln!("No config file found, creating default {}", args.config);
        Config::create_default(&args.config)?;
        eprintln!("Please edit {} with your cities and ntfy topic URL", args.config);
        return Ok(());
    }
    let config = Config::load(&args.config)?;

    init_logging(&config);

    let client = http_client::create_http_client(
        &config.user_agent,
        Duration::from_secs(config.request_timeout_seconds),
    )?;

    if let Some(url) = args.test_url {
        return test_url_fetch(&client, &url, args.save_html.as_deref()).await;
    }

    let fetcher: Arc<dyn Fetcher> = Arc::new(client.clone());

    if let Some(scraper_name) = args.test_scraper {
        return test_scraper(&scraper_name, &config, fetcher).await;
    }

    tracing::info!("Starting rentwatch...");

    let mut registry = ScraperRegistry::new();
    registry.register(Box::new(ParariusScraper::new(fetcher.clone(), &config.pararius)?));
    registry.register(Box::new(KamernetScraper::new(fetcher, &config.kamernet)?));
    tracing::info!("Registered scrapers: {:?}", registry.list_scrapers());
    tracing::info!(
        "Watching {:?}: max €{}, min {} m², furnished required: {}",
        config.cities, config.max_price, config.min_area, config.require_furnished
    );

    let store: Box<dyn SeenStore> = match config.cache_backend {
        CacheBackend::File => Box::new(FileSeenStore::new(config.seen_store_path())),
        CacheBackend::Sqlite => Box::new(SqliteSeenStore::new(config.seen_store_path())?),
    };
    let notifier = NtfyNotifier::new(client, &config.ntfy_url, &config.ntfy_tags);

    let mut poller = Poller::new(
        registry,
        Box::new(notifier),
        store,
        Criteria::from_config(&config),
        config.cities.clone(),
        Duration::from_secs(config.check_interval_seconds),
    )?;

    if args.once {
        let report = poller.run_cycle().await?;
        tracing::info!("Single cycle done: {:?}", report);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown requested"),
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
        signal_token.cancel();
    });

    poller.run(shutdown).await;

    Ok(())
}

/// Use RUST_LOG if set, otherwise the configured level
fn init_logging(config: &Config) {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
        tracing::info!("Logging level set from RUST_LOG environment variable");
    } else {
        let level = config.tracing_level.to_lowercase();
        let max_level = match level.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => {
                eprintln!("Invalid tracing level '{}', using 'info'", level);
                tracing::Level::INFO
            }
        };

        tracing_subscriber::fmt()
            .with_max_level(max_level)
            .init();

        tracing::info!("Logging level set to: {}", level);
    }
}

/// Test URL fetching - downloads and prints HTML response
async fn test_url_fetch(client: &reqwest::Client, url: &str, save_path: Option<&str>) -> Result<()> {
    println!("Testing URL fetch: {}", url);
    println!("{}", "=".repeat(80));

    let response = client.get(url).send().await?;

    println!("Status: {}", response.status());
    println!("\nResponse Headers:");
    for (name, value) in response.headers() {
        println!("  {}: {:?}", name, value);
    }

    println!("{}", "=".repeat(80));

    let body = response.text().await?;

    if let Some(path) = save_path {
        std::fs::write(path, &body)?;
        println!("HTML saved to: {}", path);
    } else {
        println!("{}", body);
    }
    println!("{}", "=".repeat(80));
    println!("Total length: {} bytes", body.len());

    Ok(())
}

/// Runs one scraper against the configured cities and prints what it finds
async fn test_scraper(scraper_name: &str, config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<()> {
    println!("Testing scraper: {}", scraper_name);
    println!("Cities: {:?}", config.cities);
    println!("{}", "=".repeat(80));

    let scraper: Box<dyn Scraper> = match scraper_name.to_lowercase().as_str() {
        "pararius" => Box::new(ParariusScraper::new(fetcher, &config.pararius)?),
        "kamernet" => Box::new(KamernetScraper::new(fetcher, &config.kamernet)?),
        name => {
            eprintln!("Unknown scraper: {}", name);
            eprintln!("Available scrapers: pararius, kamernet");
            return Ok(());
        }
    };

    let criteria = Criteria::from_config(config);
    let seen = HashSet::new();

    for city in &config.cities {
        let listings = match scraper.scrape(city, &seen).await {
            Ok(listings) => listings,
            Err(e) => {
                eprintln!("Error scraping {}: {:#}", city, e);
                continue;
            }
        };

        println!("Found {} listings for {}", listings.len(), city);
        for (i, listing) in listings.iter().enumerate() {
            let (title, body) = listing.format_notification(config.is_multi_city());
            println!("\nListing #{}", i + 1);
            println!("{}", serde_json::to_string_pretty(listing)?);
            println!("Matches criteria: {}", criteria.matches(listing));
            println!("Notification: {}\n{}", title, body);
            println!("{}", "-".repeat(80));
        }

        if listings.is_empty() {
            println!("No listings found. The selectors may need updating for the current site markup.");
        }
    }

    Ok(())
}
