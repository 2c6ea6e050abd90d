use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// A feed definition from the registry. `last_title` is the dedup boundary:
/// items at or after its position in a fresh fetch are already seen.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub day_of_week: u32,
    pub anchor_second: u32,
    pub last_title: String,
}

/// Creates the feeds table when missing. Idempotent, so a fresh database
/// file works without a separate migration step.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feeds (
            name TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            day_of_week INTEGER NOT NULL,
            anchor_second INTEGER NOT NULL,
            last_title TEXT NOT NULL DEFAULT ''
        );
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create feeds table")?;
    Ok(())
}

/// Reads every feed definition. Called once at startup; watchers own their
/// feed's state in memory afterwards.
pub async fn load_feeds(pool: &SqlitePool) -> Result<Vec<FeedConfig>> {
    sqlx::query_as::<_, FeedConfig>(
        "SELECT name, url, day_of_week, anchor_second, last_title FROM feeds",
    )
    .fetch_all(pool)
    .await
    .context("failed to read feed registry")
}

/// Point update of a feed's last seen title. Overwriting with the same
/// value is harmless, so retries need no guarding.
pub async fn update_last_title(pool: &SqlitePool, name: &str, title: &str) -> Result<()> {
    sqlx::query("UPDATE feeds SET last_title = ? WHERE name = ?")
        .bind(title)
        .bind(name)
        .execute(pool)
        .await
        .with_context(|| format!("failed to update last title for feed {}", name))?;
    Ok(())
}
