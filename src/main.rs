//! Sailor CLI.
//!
//! Resolves a TOML declaration file the same way an application would and
//! prints what it got. Secret values are never printed, only their names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use sailor::config::loader::load_options;
use sailor::observability::logging::init_logging;
use sailor::{Consumer, ResourceKind};

#[derive(Parser)]
#[command(name = "sailor")]
#[command(about = "Resolve and follow resources managed by Sailor", long_about = None)]
struct Cli {
    /// Default log filter, overridden by RUST_LOG
    #[arg(short, long, default_value = "sailor=info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire every declared resource once and print the result
    Resolve {
        /// Declaration file
        file: PathBuf,
    },
    /// Keep resources synchronized and log every new revision
    Follow {
        /// Declaration file
        file: PathBuf,

        /// How often to check for new revisions, in milliseconds
        #[arg(short, long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Resolve { file } => {
            let consumer = start(&file).await?;
            println!("{}", serde_json::to_string_pretty(&summary(&consumer))?);
        }
        Commands::Follow { file, interval_ms } => {
            let consumer = start(&file).await?;
            follow(&consumer, Duration::from_millis(interval_ms.max(1))).await;
        }
    }

    Ok(())
}

async fn start(file: &Path) -> Result<Consumer, Box<dyn std::error::Error>> {
    let options = load_options(file)?;
    let consumer = Consumer::new(options)?;
    consumer.start().await?;
    Ok(consumer)
}

/// Config as JSON, secret names and misc sizes.
fn summary(consumer: &Consumer) -> Value {
    let reader = consumer.reader();

    let config = reader.config().map(|c| (*c).clone()).unwrap_or(Value::Null);

    let mut secret_names: Vec<String> = reader
        .secrets()
        .map(|s| s.keys().cloned().collect())
        .unwrap_or_default();
    secret_names.sort();

    let misc: serde_json::Map<String, Value> = reader
        .misc_names()
        .into_iter()
        .filter_map(|name| {
            let size = reader.get_misc(&name).ok()?.len();
            Some((name, json!(size)))
        })
        .collect();

    json!({
        "config": config,
        "secrets": secret_names,
        "misc": misc,
        "revisions": {
            "config": reader.revision(ResourceKind::Config),
            "secret": reader.revision(ResourceKind::Secret),
            "misc": reader.revision(ResourceKind::Misc),
        },
    })
}

async fn follow(consumer: &Consumer, interval: Duration) {
    let kinds = [ResourceKind::Config, ResourceKind::Secret, ResourceKind::Misc];
    let mut seen: Vec<u64> = kinds.iter().map(|k| consumer.revision(*k)).collect();

    tracing::info!(
        watched = consumer.watch_registrations().len(),
        "Following resources, press Ctrl+C to stop"
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for (kind, last) in kinds.iter().zip(seen.iter_mut()) {
                    let revision = consumer.revision(*kind);
                    if revision != *last {
                        tracing::info!(kind = %kind, revision, previous = *last, "New revision");
                        *last = revision;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                return;
            }
        }
    }
}
