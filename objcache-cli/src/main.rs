//! objcache CLI
//!
//! Reads, writes and watches a single JSON object in an S3-compatible store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use objcache_cache::CachedObject;
use objcache_core::constants::{DEFAULT_TIMEOUT_SECONDS, ENV_ENDPOINT, ENV_TIMEOUT_SECS, ENV_TOKEN};
use objcache_core::traits::ObjectStore;
use objcache_core::types::RevisionTag;
use objcache_store::{HttpObjectStore, StoreConfig};

/// objcache - conditional-fetch cache for one JSON object
#[derive(Parser)]
#[command(name = "objcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Store endpoint (e.g. https://s3.eu-west-1.amazonaws.com)
    #[arg(long, global = true, env = ENV_ENDPOINT)]
    endpoint: Option<String>,

    /// Bearer token for the store
    #[arg(long, global = true, env = ENV_TOKEN, hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = ENV_TIMEOUT_SECS, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Which object to operate on.
#[derive(Args, Clone, Debug)]
struct Target {
    /// Container (bucket) name
    #[arg(short, long)]
    container: String,
    /// Object key
    #[arg(short, long)]
    key: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current value of the object
    Get {
        #[command(flatten)]
        target: Target,
        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Replace the object with a JSON value
    Set {
        #[command(flatten)]
        target: Target,
        /// JSON value (omit when using --file)
        value: Option<String>,
        /// Read the JSON value from a file
        #[arg(short, long, conflicts_with = "value")]
        file: Option<PathBuf>,
    },

    /// Poll the object and print each new revision
    Watch {
        #[command(flatten)]
        target: Target,
        /// Seconds between polls
        #[arg(short, long, default_value = "5")]
        interval: u64,
        /// Stop after this many polls
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "objcache=debug,objcache_cache=debug,objcache_store=debug,info"
    } else {
        "objcache=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = store_config(&cli)?;

    match cli.command {
        Commands::Get { target, compact } => cmd_get(config, &target, compact).await,
        Commands::Set { target, value, file } => {
            cmd_set(config, &target, value.as_deref(), file.as_deref()).await
        }
        Commands::Watch {
            target,
            interval,
            count,
        } => cmd_watch(config, &target, interval, count).await,
    }
}

fn store_config(cli: &Cli) -> Result<StoreConfig> {
    let endpoint = cli
        .endpoint
        .clone()
        .with_context(|| format!("No store endpoint: pass --endpoint or set {}", ENV_ENDPOINT))?;

    let mut config = StoreConfig::new(endpoint).with_timeout(cli.timeout);
    if let Some(token) = cli.token.as_deref().filter(|t| !t.is_empty()) {
        config = config.with_bearer_token(token);
    }
    Ok(config)
}

fn open(config: StoreConfig, target: &Target) -> Result<CachedObject<HttpObjectStore>> {
    CachedObject::from_config(&target.container, &target.key, config)
        .context("Failed to set up object cache")
}

/// Print the object
async fn cmd_get(config: StoreConfig, target: &Target, compact: bool) -> Result<()> {
    let object = open(config, target)?;

    match object.get().await.context("Failed to fetch object")? {
        Some(value) => {
            let rendered = if compact {
                serde_json::to_string(&value)?
            } else {
                serde_json::to_string_pretty(&value)?
            };
            println!("{}", rendered);
        }
        None => {
            eprintln!("{} {}", "Not found:".yellow().bold(), object.location());
        }
    }

    Ok(())
}

/// Write the object
async fn cmd_set(
    config: StoreConfig,
    target: &Target,
    value: Option<&str>,
    file: Option<&Path>,
) -> Result<()> {
    let value = read_value(value, file)?;
    let object = open(config, target)?;

    object.set(&value).await.context("Failed to store object")?;

    let revision = object
        .cached_revision()
        .await
        .map(|r| r.to_string())
        .unwrap_or_default();
    println!(
        "{} {} {}",
        "Stored".green().bold(),
        object.location(),
        format!("(revision {})", revision).dimmed()
    );

    Ok(())
}

/// Poll the object, printing only on change
async fn cmd_watch(
    config: StoreConfig,
    target: &Target,
    interval: u64,
    count: Option<u64>,
) -> Result<()> {
    if interval == 0 {
        bail!("--interval must be at least 1 second");
    }

    let object = open(config, target)?;

    println!(
        "{} {} {}",
        "Watching".cyan().bold(),
        object.location(),
        format!("every {}s", interval).dimmed()
    );

    watch(&object, Duration::from_secs(interval), count, |event| {
        match event {
            WatchEvent::Revision { revision, value } => {
                println!("{} {}", "Revision".green().bold(), revision);
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            WatchEvent::NotFound => {
                println!("{} {}", "Not found:".yellow().bold(), object.location());
            }
            WatchEvent::Retrying(reason) => {
                eprintln!("{} {}", "Poll failed, retrying:".red(), reason);
            }
        }
        Ok(())
    })
    .await?;

    let stats = object.stats().await;
    info!(
        fetches = stats.fetches,
        downloads = stats.downloads,
        revalidated = stats.revalidated,
        "Watch finished"
    );

    Ok(())
}

/// Something a watch poll saw that is worth reporting.
#[derive(Debug, PartialEq)]
enum WatchEvent {
    /// A revision not reported before
    Revision { revision: RevisionTag, value: Value },
    /// The object disappeared (reported once per disappearance)
    NotFound,
    /// A recoverable fetch failure; polling continues
    Retrying(String),
}

/// Polls `object` every `interval`, `count` times or forever.
///
/// Unchanged revisions and repeated not-found answers are not reported.
/// Non-recoverable errors end the watch.
async fn watch<S, F>(
    object: &CachedObject<S>,
    interval: Duration,
    count: Option<u64>,
    mut on_event: F,
) -> Result<()>
where
    S: ObjectStore,
    F: FnMut(WatchEvent) -> Result<()>,
{
    let mut ticker = tokio::time::interval(interval);
    let mut polls = 0u64;
    let mut last_seen: Option<RevisionTag> = None;
    let mut missing = false;

    while count.map_or(true, |limit| polls < limit) {
        ticker.tick().await;
        polls += 1;

        let value = match object.get().await {
            Ok(value) => value,
            Err(e) if e.is_recoverable() => {
                on_event(WatchEvent::Retrying(e.to_string()))?;
                continue;
            }
            Err(e) => return Err(e).context("Failed to fetch object"),
        };

        match value {
            Some(value) => {
                missing = false;
                if let Some(revision) = object.cached_revision().await {
                    if last_seen.as_ref() != Some(&revision) {
                        last_seen = Some(revision.clone());
                        on_event(WatchEvent::Revision { revision, value })?;
                    }
                }
            }
            None if !missing => {
                missing = true;
                on_event(WatchEvent::NotFound)?;
            }
            None => {}
        }
    }

    Ok(())
}

fn read_value(value: Option<&str>, file: Option<&Path>) -> Result<Value> {
    let raw = match (value, file) {
        (Some(raw), None) => raw.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Provide a JSON value or --file"),
        (Some(_), Some(_)) => bail!("Provide either a JSON value or --file, not both"),
    };

    serde_json::from_str(&raw).context("Value is not valid JSON")
}
