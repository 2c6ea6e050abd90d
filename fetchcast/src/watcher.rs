use chrono::{Local, NaiveDateTime};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::download;
use crate::ingestion::{self, FeedItem};
use crate::limiter::RequestLimiter;
use crate::schedule::Schedule;
use crate::storage::FeedConfig;

/// Message a watcher emits when a feed's newest item changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleChangeEvent {
    pub feed_name: String,
    pub new_title: String,
}

/// Shared collaborators handed to every watcher at spawn time.
pub struct WatcherContext {
    pub schedule: Schedule,
    pub limiter: Arc<RequestLimiter>,
    pub client: Client,
    pub target_dir: PathBuf,
    pub download_delay: Duration,
    pub events: mpsc::Sender<TitleChangeEvent>,
}

/// One long-lived polling loop per feed.
///
/// The watcher owns its feed's `last_title` in memory; the registry copy is
/// written asynchronously by the update sink, so a crash between detection
/// and persistence re-downloads an item on restart but never misses one.
pub struct FeedWatcher {
    feed: FeedConfig,
    ctx: Arc<WatcherContext>,
}

impl FeedWatcher {
    pub fn new(feed: FeedConfig, ctx: Arc<WatcherContext>) -> Self {
        Self { feed, ctx }
    }

    pub fn last_title(&self) -> &str {
        &self.feed.last_title
    }

    /// Runs the watch loop forever. With `check_immediately` the first check
    /// happens right away; otherwise it aligns to the feed's check grid.
    pub async fn run(mut self, check_immediately: bool) {
        info!(feed = %self.feed.name, "starting watch");

        let mut check_at = if check_immediately {
            Local::now().naive_local()
        } else {
            self.ctx.schedule.first_check_time(
                Local::now().naive_local(),
                self.feed.day_of_week,
                self.feed.anchor_second,
            )
        };

        loop {
            sleep_until_local(check_at).await;
            // The next check is planned from the previous plan, not from the
            // wake-up time, so long iterations cannot drift the grid. A plan
            // already in the past is serviced immediately.
            check_at = self.ctx.schedule.next_check_time(
                check_at,
                self.feed.day_of_week,
                self.feed.anchor_second,
            );

            let _detached = self.check_once().await;
        }
    }

    /// One polling cycle: fetch under the global request gate, then diff and
    /// dispatch. Returns the handles of the download tasks it spawned;
    /// production drops them (downloads are detached), tests await them.
    pub async fn check_once(&mut self) -> Vec<JoinHandle<()>> {
        self.ctx.limiter.acquire().await;
        info!(feed = %self.feed.name, "checking for new items");

        let fetched = ingestion::fetch_feed(&self.ctx.client, &self.feed.url).await;
        match fetched {
            Ok(items) => self.process_items(&items).await,
            Err(e) => {
                // Non-fatal: the feed stays scheduled and the next cycle is
                // an independent attempt.
                warn!(feed = %self.feed.name, error = %e, "feed fetch failed");
                Vec::new()
            }
        }
    }

    /// Diffs a fetched item list against the last seen title, spawns one
    /// detached download task per new item, and reports a head change.
    async fn process_items(&mut self, items: &[FeedItem]) -> Vec<JoinHandle<()>> {
        let mut downloads = Vec::new();
        for item in new_items(items, &self.feed.last_title) {
            info!(feed = %self.feed.name, title = %item.title, "fetching new item");
            downloads.push(self.spawn_download(item.clone()));
        }

        // The head title is the dedup boundary, updated regardless of how
        // the individual downloads fare.
        if let Some(newest) = items.first() {
            if newest.title != self.feed.last_title {
                self.feed.last_title = newest.title.clone();
                let event = TitleChangeEvent {
                    feed_name: self.feed.name.clone(),
                    new_title: self.feed.last_title.clone(),
                };
                if self.ctx.events.send(event).await.is_err() {
                    error!(feed = %self.feed.name, "event channel closed, title update lost");
                }
            }
        }

        downloads
    }

    fn spawn_download(&self, item: FeedItem) -> JoinHandle<()> {
        let ctx = self.ctx.clone();
        let feed_name = self.feed.name.clone();
        tokio::spawn(async move {
            // Give the origin server a moment to finish publishing the
            // payload before requesting it.
            if !ctx.download_delay.is_zero() {
                tokio::time::sleep(ctx.download_delay).await;
            }
            ctx.limiter.acquire().await;
            match download::fetch_to_dir(&ctx.client, &item.link, &ctx.target_dir).await {
                Ok(path) => {
                    info!(feed = %feed_name, title = %item.title, path = %path.display(), "fetched item");
                }
                Err(e) => {
                    warn!(feed = %feed_name, url = %item.link, error = %e, "item download failed");
                }
            }
        })
    }
}

/// Leading slice of `items` preceding the entry titled `last_title`. Items
/// arrive newest first, so everything before the match is new; with no match
/// the whole fetch is new.
fn new_items<'a>(items: &'a [FeedItem], last_title: &str) -> &'a [FeedItem] {
    let cutoff = items
        .iter()
        .position(|item| item.title == last_title)
        .unwrap_or(items.len());
    &items[..cutoff]
}

async fn sleep_until_local(target: NaiveDateTime) {
    let now = Local::now().naive_local();
    if let Ok(wait) = (target - now).to_std() {
        tokio::time::sleep(wait).await;
    }
}
