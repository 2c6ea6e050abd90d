use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use url::Url;

/// Derives the local filename for a payload URL: its trailing path segment.
pub fn filename_from_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).with_context(|| format!("malformed download url: {}", raw))?;
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| anyhow::anyhow!("download url has no filename: {}", raw))?;
    Ok(name.to_string())
}

/// Downloads `url` into `target_dir`, named after the URL's trailing path
/// segment. A file already carrying that name is overwritten.
pub async fn fetch_to_dir(client: &Client, url: &str, target_dir: &Path) -> Result<PathBuf> {
    let path = target_dir.join(filename_from_url(url)?);

    let response = client
        .get(url)
        .send()
        .await
        .context("network error during download")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("download failed with status: {}", status);
    }

    let bytes = response
        .bytes()
        .await
        .context("failed to read download body")?;
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_the_trailing_path_segment() {
        assert_eq!(
            filename_from_url("https://example.com/files/ep5.mp3").expect("filename"),
            "ep5.mp3"
        );
        assert_eq!(
            filename_from_url("https://example.com/a/b/c?query=1").expect("filename"),
            "c"
        );
    }

    #[test]
    fn urls_without_a_filename_are_rejected() {
        assert!(filename_from_url("https://example.com/").is_err());
        assert!(filename_from_url("https://example.com/files/").is_err());
        assert!(filename_from_url("not a url").is_err());
    }
}
