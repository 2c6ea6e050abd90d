use anyhow::{Context, Result};
use reqwest::Client;

/// Pushes an update notification for `feed_name` as a form POST. The
/// response body is discarded; callers treat failures as best-effort.
pub async fn push_update(client: &Client, url: &str, feed_name: &str) -> Result<()> {
    let response = client
        .post(url)
        .form(&[("text", feed_name)])
        .send()
        .await
        .context("network error during update push")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("update push failed with status: {}", status);
    }
    Ok(())
}
