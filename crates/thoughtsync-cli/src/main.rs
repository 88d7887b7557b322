//! thoughtsync - keep a local knowledge base in step with its published
//! snapshot.
//!
//! On a consumer device `sync` pulls the published `thought-data.json` into the
//! local cache and `poll` keeps checking for newer publishes. On a producer
//! device `import` loads an edited dataset and `export` stamps it and writes
//! the file to upload by hand.

mod views;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use thoughtsync_core::utils::{age_display, format_timestamp};
use thoughtsync_core::{Config, Role, SyncAttempt, SyncService};
use views::ViewLoader;

/// Log file name prefix inside the cache directory's `logs/` folder
const LOG_FILE_PREFIX: &str = "thoughtsync.log";

/// Subscriber id of the terminal summary view
const SUMMARY_VIEW_ID: &str = "summary";

#[derive(Parser)]
#[command(name = "thoughtsync", version, about = "Sync a local knowledge base with its published snapshot")]
struct Cli {
    /// Force the device role instead of deriving it from the user agent
    #[arg(long, global = true)]
    role: Option<Role>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pull the published snapshot once (consumer)
    Sync,
    /// Pull, then keep checking for newer publishes until Ctrl-C (consumer)
    Poll {
        /// Seconds between checks (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Stamp the local dataset and write thought-data.json for upload (producer)
    Export {
        /// Directory to write into (defaults to the configured export dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the local dataset from a JSON file (producer)
    Import {
        file: PathBuf,
        /// Accept a file that is not newer than the local dataset
        #[arg(long)]
        force: bool,
    },
    /// Show role, cached data and its age
    Status,
}

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr and to a daily file under `log_dir`.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("warning: failed to load config, using defaults: {:#}", e);
            Config::default()
        }
    };
    if let Some(role) = cli.role {
        config.role = Some(role);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(&cli);

    let cache_dir = config.cache_dir()?;
    let log_dir = cache_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log dir: {}", log_dir.display()))?;
    let _log_guard = init_tracing(&log_dir);
    info!("thoughtsync starting");

    let service = Arc::new(SyncService::from_config(&config)?);
    service.dispatcher().subscribe(
        SUMMARY_VIEW_ID,
        Arc::new(ViewLoader::for_role(io::stdout(), service.role())),
    );

    match cli.command {
        Command::Sync => {
            let attempt = service.sync_if_consumer().await;
            report(&attempt);
        }
        Command::Poll { interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            poll(&service, interval).await?;
        }
        Command::Export { out } => {
            let artifact = service.export_snapshot()?;
            let dir = out.unwrap_or_else(|| config.export_dir());
            let path = artifact.write_to(&dir)?;
            println!("Exported {}", path.display());
            println!("Upload this file to the root of the published repository to update consumers.");
        }
        Command::Import { file, force } => {
            let dataset = service.import_snapshot(&file, force)?;
            println!(
                "Imported {} (published {})",
                file.display(),
                dataset.last_updated.as_deref().unwrap_or("unknown")
            );
        }
        Command::Status => status(&service, &config),
    }

    info!("thoughtsync finished");
    Ok(())
}

fn report(attempt: &SyncAttempt) {
    println!("{}", attempt.summary());
    if let Some(ref advisory) = attempt.advisory {
        eprintln!("warning: {}", advisory.message);
    }
}

async fn poll(service: &Arc<SyncService>, interval: Duration) -> Result<()> {
    if service.role() != Role::Consumer {
        warn!("Polling requested on a producer device");
        println!("This device publishes; there is nothing to poll.");
        return Ok(());
    }

    report(&service.sync_if_consumer().await);
    let handle = service.poll_for_updates(interval);
    println!("Checking for updates every {}s, Ctrl-C to stop", interval.as_secs());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.stop();
    Ok(())
}

fn status(service: &SyncService, config: &Config) {
    println!("Role:    {}", service.role());
    println!("Remote:  {}", config.remote_url());
    println!("Cache:   {}", service.cache().cache_dir().display());

    let Some(entry) = service.cache_entry() else {
        println!("Data:    none cached yet");
        return;
    };

    let stats = entry.dataset.stats();
    println!(
        "Data:    {} thoughts, {} models, {} tags",
        stats.thoughts, stats.models, stats.tags
    );
    match entry.dataset.published_at() {
        Some(at) => println!(
            "Updated: {} ({})",
            format_timestamp(at),
            age_display(at, Utc::now())
        ),
        None => println!("Updated: unknown"),
    }
}
