//! Bounty-Harvest main entry point
//!
//! This is the command-line interface for the Bounty-Harvest program crawler.

use anyhow::{Context, Result};
use bounty_harvest::config::{load_config_with_hash, Config};
use bounty_harvest::crawler::{run_crawl, select_platforms, CrawlOptions};
use bounty_harvest::output::{collect_status, print_status};
use bounty_harvest::Platform;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Bounty-Harvest: a resumable bug-bounty program crawler
///
/// Bounty-Harvest walks the program listings of HackerOne, Bugcrowd,
/// YesWeHack and Intigriti, fetches each program's scope details and
/// writes one JSON file per platform. Interrupted crawls resume from
/// the last stored page and program.
#[derive(Parser, Debug)]
#[command(name = "bounty-harvest")]
#[command(version)]
#[command(about = "A resumable bug-bounty program crawler", long_about = None)]
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

    /// Discard stored progress and results before crawling
    #[arg(long)]
    fresh: bool,

    /// Only crawl this platform (repeatable)
    #[arg(short, long = "platform", value_name = "NAME")]
    platforms: Vec<Platform>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show stored crawl status and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let options = CrawlOptions {
        fresh: cli.fresh,
        platforms: cli.platforms,
    };

    if cli.dry_run {
        handle_dry_run(&config, &options)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &options).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` overrides the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "bounty_harvest=info,warn",
            1 => "bounty_harvest=debug,info",
            2 => "bounty_harvest=trace,debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, options: &CrawlOptions) -> Result<()> {
    println!("=== Bounty-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Detail batch size: {}", config.crawler.detail_batch_size);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Retry delay: {}ms", config.crawler.retry_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Finalize partial: {}", config.crawler.finalize_partial);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Backend: {:?}", config.output.storage_backend);
    println!("  Progress: {}", config.output.progress_dir);
    println!("  Results: {}", config.output.results_dir);
    if let Some(path) = &config.output.database_path {
        println!("  Database: {}", path);
    }

    let entries = select_platforms(config, options)?;
    println!("\nPlatforms ({}):", entries.len());
    for entry in &entries {
        let credentials = match entry.credential_env()? {
            Some((user, token)) => format!("credentials from ${} / ${}", user, token),
            None => "no credentials".to_string(),
        };
        println!("  - {} at {} ({})", entry.name, entry.base_url()?, credentials);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows stored crawl status
fn handle_stats(config: &Config) -> Result<()> {
    let statuses = collect_status(config)?;
    print_status(&statuses);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, options: &CrawlOptions) -> Result<()> {
    if options.fresh {
        tracing::info!("Starting fresh crawl (discarding stored records)");
    } else {
        tracing::info!("Starting crawl (will resume stored progress)");
    }

    let outcomes = run_crawl(config, options)
        .await
        .context("Crawl failed")?;

    for (platform, outcome) in &outcomes {
        println!("{}: {}", platform, outcome);
    }
    tracing::info!("Crawl completed for {} platforms", outcomes.len());
    Ok(())
}
