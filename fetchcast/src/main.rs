/*
fetchcast - main.rs
Loads the feed registry, spawns one watcher task per feed, and drains their
title-change events into the registry through a single update sink.
*/

use anyhow::Result;
use clap::Parser;
use common::{init_db_pool, Config};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fetchcast::limiter::RequestLimiter;
use fetchcast::schedule::Schedule;
use fetchcast::sink::UpdateSink;
use fetchcast::storage;
use fetchcast::watcher::{FeedWatcher, WatcherContext};

#[derive(Parser, Debug)]
#[command(name = "fetchcast", about = "Scheduled feed watcher and downloader")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Target directory to download to (overrides [download].target_dir)
    #[arg(long, value_name = "DIR")]
    target: Option<PathBuf>,

    /// Check every feed immediately on startup instead of waiting for its
    /// next grid-aligned check time
    #[arg(long)]
    check_immediately: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            anyhow::bail!("config file not found: {}", p.display());
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() {
            Some(&default_path)
        } else {
            None
        },
        override_path.as_deref(),
    )
    .await?;
    info!(default = ?default_path, override_file = ?override_path, "configuration loaded");

    // Startup validation: everything fatal happens before any watcher runs.
    let target_dir = args
        .target
        .or_else(|| config.target_dir().map(PathBuf::from))
        .ok_or_else(|| {
            anyhow::anyhow!("a download target directory is required (--target or [download].target_dir)")
        })?;

    if config.check_interval_seconds() == 0
        || config.rapid_check_interval_seconds() == 0
        || config.request_delay_seconds() == 0
    {
        anyhow::bail!("check and request intervals must be at least one second");
    }

    info!("starting fetchcast");

    let pool = init_db_pool(config.db_path()).await?;
    storage::ensure_schema(&pool).await?;
    let feeds = storage::load_feeds(&pool).await?;
    info!(count = feeds.len(), db = %config.db_path(), "loaded feed registry");
    if feeds.is_empty() {
        warn!("feed registry is empty, nothing to watch");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_seconds()))
        .user_agent("fetchcast/0.1.0")
        .build()?;

    let schedule = Schedule::new(
        config.check_interval_seconds(),
        config.rapid_check_interval_seconds(),
        config.rapid_check_duration_seconds(),
    );
    let limiter = Arc::new(RequestLimiter::new(Duration::from_secs(
        config.request_delay_seconds(),
    )));

    // Capacity 1: a watcher's send waits for the sink, so a slow sink
    // throttles watchers instead of growing a backlog.
    let (events_tx, events_rx) = mpsc::channel(1);

    let ctx = Arc::new(WatcherContext {
        schedule,
        limiter,
        client: client.clone(),
        target_dir,
        download_delay: Duration::from_secs(config.download_delay_seconds()),
        events: events_tx,
    });

    for feed in feeds {
        let watcher = FeedWatcher::new(feed, ctx.clone());
        tokio::spawn(watcher.run(args.check_immediately));
    }
    // The watchers hold the only remaining event senders; the sink runs
    // until the last of them is gone.
    drop(ctx);

    let sink = UpdateSink::new(pool, client, config.update_notify_url().map(String::from));
    sink.run(events_rx).await;

    Ok(())
}
