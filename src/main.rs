//! Saunter main entry point
//!
//! This is the command-line interface for the saunter web crawler.

use anyhow::{Context, Result};
use clap::Parser;
use saunter::config::load_config_with_hash;
use saunter::crawler::run_crawl;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Saunter: a polite, resumable web crawler
///
/// Saunter walks outward from a set of seed addresses, fetching pages up
/// to a configured limit while spacing out requests per host. Interrupted
/// crawls persist their pending work and pick up where they left off.
#[derive(Parser, Debug)]
#[command(name = "saunter")]
#[command(version = "0.1.0")]
#[command(about = "A polite, resumable web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, discarding previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("saunter=info,warn"),
            1 => EnvFilter::new("saunter=debug,info"),
            2 => EnvFilter::new("saunter=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &saunter::config::Config) -> Result<()> {
    println!("=== Saunter Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_urls);
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Shutdown grace: {}s", config.crawler.shutdown_grace_secs);
    println!("  Database: {}", config.crawler.database_path);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.crawler.seeds.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &saunter::config::Config) -> Result<()> {
    use saunter::storage::{SqliteStore, Store};
    use std::path::Path;

    println!("Database: {}\n", config.crawler.database_path);

    let store = SqliteStore::new(Path::new(&config.crawler.database_path))
        .context("Could not open the crawl database")?;

    println!("Pages visited: {}", store.count_visits()?);
    println!("Pages queued:  {}", store.count_frontier()?);

    let breakdown = store.status_breakdown()?;
    if !breakdown.is_empty() {
        println!("\nStatus breakdown:");
        for (status, count) in breakdown {
            if status < 0 {
                println!("  transport failure: {}", count);
            } else {
                println!("  HTTP {}: {}", status, count);
            }
        }
    }

    if let Some(run) = store.get_latest_run()? {
        println!("\nLast run: #{} ({})", run.id, run.status.to_db_string());
        println!("  Started:  {}", run.started_at);
        if let Some(finished) = run.finished_at {
            println!("  Finished: {}", finished);
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: saunter::config::Config,
    config_hash: &str,
    fresh: bool,
) -> Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding previous state)");
    } else {
        tracing::info!("Starting crawl (resuming stored frontier if one exists)");
    }

    // Ctrl-C flips the token; the scheduler winds down and flushes, and
    // the process still exits cleanly
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, finishing in-flight fetches");
                signal_cancel.cancel();
            }
            Err(e) => tracing::warn!("Could not listen for interrupts: {}", e),
        }
    });

    match run_crawl(config, config_hash, fresh, cancel).await {
        Ok(()) => {
            tracing::info!("Crawl finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
