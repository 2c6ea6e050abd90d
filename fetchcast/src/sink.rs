use reqwest::Client;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::notify;
use crate::storage;
use crate::watcher::TitleChangeEvent;

/// Single consumer of watcher events.
///
/// Draining the channel one event at a time serializes every registry write,
/// so no two writes for the same feed can race. Notification pushes are
/// fired as detached tasks and never hold the sink up.
pub struct UpdateSink {
    pool: SqlitePool,
    client: Client,
    notify_url: Option<String>,
}

impl UpdateSink {
    pub fn new(pool: SqlitePool, client: Client, notify_url: Option<String>) -> Self {
        Self {
            pool,
            client,
            notify_url,
        }
    }

    /// Drains the channel until every sender is gone. A slow write
    /// backpressures the sending watcher through the bounded channel.
    pub async fn run(self, mut events: mpsc::Receiver<TitleChangeEvent>) {
        info!("update sink started");
        while let Some(event) = events.recv().await {
            let _detached = self.handle_event(event).await;
        }
        info!("update sink stopped");
    }

    /// Persists one title change and, when configured, fires a detached
    /// notification push. Returns the push task's handle so tests can await
    /// it; production drops it.
    pub async fn handle_event(&self, event: TitleChangeEvent) -> Option<JoinHandle<()>> {
        info!(feed = %event.feed_name, title = %event.new_title, "recording last title");
        if let Err(e) =
            storage::update_last_title(&self.pool, &event.feed_name, &event.new_title).await
        {
            // The watcher keeps the new title in memory, so the next event
            // for this feed retries the write.
            error!(feed = %event.feed_name, error = %e, "failed to persist last title");
        }

        let url = self.notify_url.clone()?;
        let client = self.client.clone();
        let feed_name = event.feed_name;
        Some(tokio::spawn(async move {
            if let Err(e) = notify::push_update(&client, &url, &feed_name).await {
                warn!(feed = %feed_name, error = %e, "update notification failed");
            }
        }))
    }
}
