//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror static site mirror.

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_mirror::config::{load_config_with_hash, Config, StrategyKind};
use sumi_mirror::output::{
    archive_name, print_statistics, LogSubscriber, ProgressEvent, ProgressSubscriber,
};
use sumi_mirror::{normalize_start_url, BaseDomain, TaskRegistry, TaskRequest, TaskStatus};
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: a static website mirror
///
/// Sumi-Mirror fetches a bounded set of same-domain pages and their assets,
/// rewrites internal links to relative paths and packages the result into a
/// zip archive ready for static hosting.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version)]
#[command(about = "A static website mirror", long_about = None)]
struct Cli {
    /// Start URL (http:// is assumed when no scheme is given)
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of URLs to process
    #[arg(long, value_name = "N")]
    max_urls: Option<u32>,

    /// Pause between two fetches in milliseconds
    #[arg(long, value_name = "MS")]
    throttle_ms: Option<u64>,

    /// Use the external mirroring tool (wget) instead of the built-in engine
    #[arg(long)]
    external: bool,

    /// Working directory for task trees and archives
    #[arg(short, long, value_name = "WORK_DIR")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and URL and show what would be mirrored without crawling
    #[arg(long)]
    dry_run: bool,

    /// Print progress events to stdout as JSON lines
    #[arg(long)]
    json: bool,

    /// Keep the task working tree after the archive is built
    #[arg(long)]
    keep: bool,
}

/// Writes each progress event to stdout as one JSON object per line
struct JsonLinesSubscriber;

#[async_trait]
impl ProgressSubscriber for JsonLinesSubscriber {
    async fn deliver(&self, event: ProgressEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize progress event: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(work_dir) = &cli.output {
        config.output.work_dir = work_dir.to_string_lossy().into_owned();
    }

    let mut request = TaskRequest::new(cli.url.clone());
    request.max_urls = cli.max_urls;
    request.throttle_ms = cli.throttle_ms;
    if cli.external {
        request.strategy = Some(StrategyKind::External);
    }

    if cli.dry_run {
        handle_dry_run(&config, &request)
    } else {
        handle_mirror(config, &request, cli.json, cli.keep).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so --json output on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates the request and shows what would be mirrored
fn handle_dry_run(config: &Config, request: &TaskRequest) -> anyhow::Result<()> {
    let start_url = normalize_start_url(&request.url)?;
    let base = BaseDomain::from_url(&start_url)?;

    let max_urls = request.max_urls.unwrap_or(config.crawler.max_urls);
    let throttle_ms = request.throttle_ms.unwrap_or(config.crawler.throttle_ms);
    let strategy = request.strategy.unwrap_or(config.strategy.kind);

    println!("=== Sumi-Mirror Dry Run ===\n");

    println!("Target:");
    println!("  Start URL: {}", start_url);
    println!("  Base domain: {}", base);

    println!("\nCrawler Configuration:");
    println!("  Strategy: {}", strategy);
    println!("  Max URLs: {}", max_urls);
    println!("  Throttle: {}ms", throttle_ms);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Connect timeout: {}ms", config.crawler.connect_timeout_ms);
    println!("  Retries: {}", config.crawler.max_retries);
    if strategy == StrategyKind::External {
        println!("  External tool: {}", config.strategy.wget_path);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Work directory: {}", config.output.work_dir);
    println!(
        "  Archive name: {}",
        archive_name(&base, chrono::Utc::now().timestamp())
    );

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main mirroring operation
async fn handle_mirror(
    config: Config,
    request: &TaskRequest,
    json: bool,
    keep: bool,
) -> anyhow::Result<()> {
    let subscriber: Arc<dyn ProgressSubscriber> = if json {
        Arc::new(JsonLinesSubscriber)
    } else {
        Arc::new(LogSubscriber)
    };
    let registry = TaskRegistry::new(config, subscriber);

    let handle = registry
        .create(request)
        .with_context(|| format!("Failed to start mirroring {}", request.url))?;
    tracing::info!("Task {} started", handle.id());

    let snapshot = handle.wait().await;

    if !json {
        print_statistics(&snapshot);
    }

    if snapshot.status != TaskStatus::Completed {
        bail!(
            "Mirroring failed: {}",
            snapshot.error.as_deref().unwrap_or("unknown error")
        );
    }

    if keep {
        if let Some(site_root) = &snapshot.site_root {
            tracing::info!("Mirrored tree kept at {}", site_root.display());
        }
    } else {
        handle
            .remove_tree()
            .await
            .context("Failed to remove the task working tree")?;
    }

    let archive = registry.download(handle.id())?;
    tracing::info!("Archive ready: {}", archive.display());
    if !json {
        println!("\n✓ Archive written to: {}", archive.display());
    }

    Ok(())
}
