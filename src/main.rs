//! Signage Display
//!
//! A full-screen kiosk display that:
//! - Rotates through weekday image sets on a fixed timer
//! - Accepts keyboard/remote input to jump between option, day and image
//! - Preloads every catalog image at startup
//! - Substitutes a placeholder for images that fail to load

mod assets;
mod catalog;
mod config;
mod display;
mod engine;
mod input;
mod logging;
mod rotation;
mod runtime;

use anyhow::Context;
use assets::AssetCache;
use catalog::Catalog;
use clap::{Parser, ValueEnum};
use config::{Config, Weekday};
use display::TerminalSurface;
use engine::Engine;
use input::Dispatcher;
use runtime::Runtime;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Built-in catalog layouts
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    Weekly,
    Grouped,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "signage-display")]
#[command(about = "Full-screen signage display with timed image rotation")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Seconds between automatic advances (overrides config)
    #[arg(long)]
    interval: Option<u64>,

    /// Use a built-in catalog instead of the configured one
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    /// Skip preloading images at startup
    #[arg(long)]
    no_preload: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Append logs to this file (overrides config)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Validate configuration, print a summary and exit
    #[arg(long)]
    check: bool,

    /// Print every image reference in the catalog and exit
    #[arg(long)]
    list: bool,

    /// Write the default configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    init: Option<String>,
}

/// Using current_thread runtime: the display loop is the only busy task
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, load_error) = Config::load_or_default(&args.config);
    let log_file = args.log_file.as_deref().or(config.log_file.as_deref());
    logging::init_logging(args.verbose || config.verbose, log_file);

    if let Some(path) = &args.init {
        Config::default()
            .save(path)
            .with_context(|| format!("Failed to write {}", path))?;
        println!("Default configuration written to {}", path);
        return Ok(());
    }

    if let Some(e) = load_error {
        tracing::warn!("Failed to load config from {}: {}", args.config, e);
        tracing::info!("Using default configuration");
    }

    if let Some(layout) = args.layout {
        config.catalog = match layout {
            Layout::Weekly => catalog::builtin::weekly(),
            Layout::Grouped => catalog::builtin::grouped(),
        };
    }
    if let Some(interval) = args.interval {
        config.rotation_interval_secs = interval;
    }
    config.validate().context("Invalid configuration")?;

    if args.check {
        print_summary(&config);
        return Ok(());
    }

    if args.list {
        for reference in config.catalog.all_references() {
            println!("{}", reference);
        }
        return Ok(());
    }

    tracing::info!("Starting signage display");

    let catalog = Arc::new(config.catalog.clone());
    let engine = Engine::new(Arc::clone(&catalog), Weekday::today(), &config.placeholder_base)?;
    let dispatcher = Dispatcher::new(&catalog);
    let cache = AssetCache::new(config.asset_root.clone());

    // Setup shutdown signal handling
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if config.preload && !args.no_preload {
        let references = catalog.all_references();
        let preload_cache = cache.clone();
        let mut preload_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                report = assets::preload(references, preload_cache) => {
                    if report.failed > 0 {
                        tracing::warn!(
                            "{} of {} images failed to preload",
                            report.failed,
                            report.ready + report.failed
                        );
                    }
                }
                _ = preload_shutdown.recv() => {
                    tracing::info!("Preload cancelled by shutdown");
                }
            }
        });
    }

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        tracing::info!("Shutdown signal received");
        let _ = signal_tx.send(());
    });

    let (key_tx, key_rx) = mpsc::channel(16);
    let updates = cache.subscribe();
    let fetcher = assets::spawn_fetcher(cache.clone());
    let surface = TerminalSurface::open(cache)?.with_fetcher(fetcher);
    let reader = input::spawn_reader(key_tx);

    let mut runtime = Runtime::new(engine, dispatcher, config.rotation_interval(), surface);
    runtime.watch_assets(updates);
    let result = runtime.run(key_rx, shutdown_tx.subscribe()).await;
    tracing::debug!("Final selection: {:?}", runtime.engine().status());

    // Stop the preloader and give the terminal back before reporting
    let _ = shutdown_tx.send(());
    drop(runtime);
    if reader.join().is_err() {
        tracing::warn!("Key reader panicked");
    }

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_summary(config: &Config) {
    let catalog = &config.catalog;
    println!("Layout: {}", catalog.layout_name());
    match catalog {
        Catalog::Weekly(weekly) => {
            for option in &weekly.options {
                let days: Vec<&str> = option.days.iter().map(|d| d.day.display_name()).collect();
                println!("  Option {}: {}", option.key, days.join(", "));
            }
            println!("Default option: {}", weekly.default_option);
        }
        Catalog::Grouped(grouped) => {
            for group in &grouped.groups {
                println!(
                    "  Group {} (key {}): {}",
                    group.name,
                    group.key,
                    group.members.join(", ")
                );
            }
            println!("Default group: {}", grouped.default_group);
        }
    }
    println!("Images: {}", catalog.all_references().len());
    println!("Rotation interval: {}s", config.rotation_interval_secs);
    println!("Asset root: {}", config.asset_root.display());
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}
