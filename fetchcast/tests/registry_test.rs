use common::init_db_pool;
use fetchcast::storage;
use sqlx::SqlitePool;
use std::time::SystemTime;

// Helper to create a test pool on a fresh database file
async fn setup_test_db(tag: &str) -> SqlitePool {
    let now = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let db_path = std::env::temp_dir().join(format!("fetchcast_{}_{}.db", tag, now));
    let pool = init_db_pool(&db_path.to_string_lossy())
        .await
        .expect("init pool");
    storage::ensure_schema(&pool).await.expect("ensure schema");
    pool
}

#[tokio::test]
async fn schema_load_update_roundtrip() {
    let pool = setup_test_db("roundtrip").await;
    // Bootstrapping twice is harmless.
    storage::ensure_schema(&pool).await.expect("schema is idempotent");

    sqlx::query(
        "INSERT INTO feeds (name, url, day_of_week, anchor_second, last_title)
         VALUES ('alpha', 'https://example.com/alpha.xml', 1, 3600, 'Ep4'),
                ('beta', 'https://example.com/beta.xml', 5, 0, '')",
    )
    .execute(&pool)
    .await
    .expect("seed feeds");

    let feeds = storage::load_feeds(&pool).await.expect("load feeds");
    assert_eq!(feeds.len(), 2);

    let alpha = feeds
        .iter()
        .find(|f| f.name == "alpha")
        .expect("alpha loaded");
    assert_eq!(alpha.url, "https://example.com/alpha.xml");
    assert_eq!(alpha.day_of_week, 1);
    assert_eq!(alpha.anchor_second, 3600);
    assert_eq!(alpha.last_title, "Ep4");

    storage::update_last_title(&pool, "alpha", "Ep5")
        .await
        .expect("update last title");

    let feeds = storage::load_feeds(&pool).await.expect("reload feeds");
    let alpha = feeds
        .iter()
        .find(|f| f.name == "alpha")
        .expect("alpha reloaded");
    let beta = feeds
        .iter()
        .find(|f| f.name == "beta")
        .expect("beta reloaded");
    assert_eq!(alpha.last_title, "Ep5");
    assert_eq!(beta.last_title, "");
}

#[tokio::test]
async fn updating_an_unknown_feed_is_a_noop() {
    let pool = setup_test_db("unknown").await;

    storage::update_last_title(&pool, "ghost", "Ep1")
        .await
        .expect("update succeeds with no matching row");

    let feeds = storage::load_feeds(&pool).await.expect("load feeds");
    assert!(feeds.is_empty());
}
