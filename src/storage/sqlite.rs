//! SQLite local tier

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{capacity_for, decode, AnnotationStore, Capacity, StoreError};
use crate::annotations::{PageIdentity, SiteRecord};

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Page records stored as JSON payloads, one row per page
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    max_annotations: Option<usize>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, max_annotations: Option<usize>) -> Self {
        Self {
            pool,
            max_annotations,
        }
    }

    /// Initialize the site_records table
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS site_records (
                page_id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Total annotations across every stored page.
    ///
    /// Payloads are decoded on every call; rows that no longer decode count
    /// as empty.
    pub async fn stored_annotations(&self) -> Result<usize, StoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT page_id, payload FROM site_records")
                .fetch_all(&self.pool)
                .await?;

        let mut total = 0;
        for (page_id, payload) in rows {
            match serde_json::from_str::<SiteRecord>(&payload) {
                Ok(record) => total += record.annotation_count(),
                Err(e) => tracing::warn!("Unreadable record for page {}: {}", page_id, e),
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl AnnotationStore for SqliteStore {
    async fn persist(&self, page: &PageIdentity, record: &SiteRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)?;

        sqlx::query(
            r#"
            INSERT INTO site_records (page_id, url, payload, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(page_id) DO UPDATE SET
                url = excluded.url,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(page.as_str())
        .bind(&record.info.url)
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, page: &PageIdentity) -> Result<Option<SiteRecord>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM site_records WHERE page_id = ?")
                .bind(page.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(payload,)| decode(page, &payload)).transpose()
    }

    async fn delete(&self, page: &PageIdentity) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM site_records WHERE page_id = ?")
            .bind(page.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn can_persist(&self, page: &PageIdentity) -> Result<Capacity, StoreError> {
        let stored = self.stored_annotations().await?;
        let capacity = capacity_for(stored, self.max_annotations);
        if !capacity.can_add {
            tracing::debug!(
                "Capacity reached for page {}: {} stored, limit {:?}",
                page,
                stored,
                self.max_annotations
            );
        }
        Ok(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnchoredRecord, AnnotationKind, PageInfo, SegmentDescriptor};

    async fn store(max_annotations: Option<usize>) -> SqliteStore {
        // One connection: every connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStore::new(pool, max_annotations);
        store.init().await.unwrap();
        store
    }

    fn record(url: &str, annotations: usize) -> SiteRecord {
        let mut site = SiteRecord::new(PageIdentity::from_url(url), PageInfo::new(url, "Title"));
        for i in 0..annotations {
            site.add(AnchoredRecord {
                kind: AnnotationKind::Highlight,
                color: None,
                mark_id: format!("m{i}"),
                highlight_id: format!("h{i}"),
                anchor_text: "text".to_string(),
                segments: vec![SegmentDescriptor {
                    text: "text".to_string(),
                    preceding_context: String::new(),
                    following_context: String::new(),
                }],
                note_text: None,
                created_at: Utc::now(),
            })
            .unwrap();
        }
        site
    }

    #[tokio::test]
    async fn test_persist_load_delete() {
        let store = store(None).await;
        let site = record("https://example.com/a", 2);

        assert!(store.load(&site.identity).await.unwrap().is_none());

        store.persist(&site.identity, &site).await.unwrap();
        let loaded = store.load(&site.identity).await.unwrap().unwrap();
        assert_eq!(loaded.identity, site.identity);
        assert_eq!(loaded.annotation_count(), 2);

        store.delete(&site.identity).await.unwrap();
        assert!(store.load(&site.identity).await.unwrap().is_none());
        // Deleting twice is fine
        store.delete(&site.identity).await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_replaces() {
        let store = store(None).await;
        let mut site = record("https://example.com/a", 1);
        store.persist(&site.identity, &site).await.unwrap();

        site.upsert_note("m0", "later");
        store.persist(&site.identity, &site).await.unwrap();

        let loaded = store.load(&site.identity).await.unwrap().unwrap();
        assert_eq!(loaded.note("m0"), Some("later"));
    }

    #[tokio::test]
    async fn test_capacity_rescans_every_page() {
        let store = store(Some(3)).await;
        let a = record("https://example.com/a", 2);
        let b = record("https://example.org/b", 1);

        store.persist(&a.identity, &a).await.unwrap();
        assert!(store.can_persist(&b.identity).await.unwrap().can_add);

        store.persist(&b.identity, &b).await.unwrap();
        assert_eq!(store.stored_annotations().await.unwrap(), 3);
        assert!(!store.can_persist(&b.identity).await.unwrap().can_add);

        store.delete(&a.identity).await.unwrap();
        assert!(store.can_persist(&b.identity).await.unwrap().can_add);
    }

    #[tokio::test]
    async fn test_unlimited_by_default() {
        let store = store(None).await;
        let a = record("https://example.com/a", 50);
        store.persist(&a.identity, &a).await.unwrap();

        assert!(store.can_persist(&a.identity).await.unwrap().can_add);
    }
}
