use anyhow::{Context, Result};
use feed_rs::parser;
use reqwest::Client;

/// One entry of a fetched feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
}

/// Fetches a feed and maps its entries to title/link pairs in document
/// order. Feeds list their newest item first; the watchers rely on that
/// ordering when diffing against the last seen title.
pub async fn fetch_feed(client: &Client, url: &str) -> Result<Vec<FeedItem>> {
    let response = client
        .get(url)
        .send()
        .await
        .context("network error during feed fetch")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("feed fetch failed with status: {}", status);
    }

    let bytes = response.bytes().await.context("failed to read feed body")?;
    let feed = parser::parse(bytes.as_ref()).context("failed to parse feed")?;

    Ok(feed
        .entries
        .iter()
        .map(|entry| FeedItem {
            title: entry
                .title
                .as_ref()
                .map(|t| t.content.clone())
                .unwrap_or_default(),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
        })
        .collect())
}
