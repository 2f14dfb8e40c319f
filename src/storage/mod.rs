//! Annotation store
//!
//! The engine only ever talks to storage through [`AnnotationStore`]:
//! whole-page records are persisted, loaded and deleted by page identity,
//! and a capacity check runs before any record grows.
//!
//! - [`SqliteStore`]: local tier backed by an sqlx pool
//! - [`MemoryStore`]: process-local map, used by tests and ephemeral setups

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{create_pool, SqliteStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotations::{PageIdentity, SiteRecord};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Answer of a capacity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    pub can_add: bool,
}

impl Capacity {
    pub fn allowed() -> Self {
        Self { can_add: true }
    }

    pub fn denied() -> Self {
        Self { can_add: false }
    }
}

/// Durable storage for page records
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Insert or replace the record of a page
    async fn persist(&self, page: &PageIdentity, record: &SiteRecord) -> Result<(), StoreError>;

    /// Record of a page, `None` when nothing is stored
    async fn load(&self, page: &PageIdentity) -> Result<Option<SiteRecord>, StoreError>;

    /// Drop the record of a page; deleting a missing record is not an error
    async fn delete(&self, page: &PageIdentity) -> Result<(), StoreError>;

    /// Whether one more annotation may be stored for `page`
    async fn can_persist(&self, page: &PageIdentity) -> Result<Capacity, StoreError>;
}

/// Decode a stored payload and attach its key
pub(crate) fn decode(page: &PageIdentity, payload: &str) -> Result<SiteRecord, StoreError> {
    let mut record: SiteRecord = serde_json::from_str(payload)?;
    record.identity = page.clone();
    Ok(record)
}

/// Whether `record` may replace what is stored for `page`.
///
/// Only a record holding more annotations than the stored one needs room;
/// anything else (recolor, note edits, removals) is always admitted.
pub async fn admits(
    store: &dyn AnnotationStore,
    page: &PageIdentity,
    record: &SiteRecord,
) -> Result<bool, StoreError> {
    let stored = store
        .load(page)
        .await?
        .map_or(0, |existing| existing.annotation_count());
    if record.annotation_count() <= stored {
        return Ok(true);
    }
    Ok(store.can_persist(page).await?.can_add)
}

/// Capacity given how many annotations are already stored
pub(crate) fn capacity_for(stored: usize, limit: Option<usize>) -> Capacity {
    match limit {
        Some(max) if stored >= max => Capacity::denied(),
        _ => Capacity::allowed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationRecord, PageInfo};

    #[test]
    fn test_capacity_limits() {
        assert_eq!(capacity_for(0, None), Capacity::allowed());
        assert_eq!(capacity_for(1_000_000, None), Capacity::allowed());
        assert_eq!(capacity_for(9, Some(10)), Capacity::allowed());
        assert_eq!(capacity_for(10, Some(10)), Capacity::denied());
        assert_eq!(capacity_for(0, Some(0)), Capacity::denied());
    }

    #[tokio::test]
    async fn test_only_growth_needs_room() {
        let store = MemoryStore::with_limit(1);
        let url = "https://example.com/limit";
        let page = PageIdentity::from_url(url);
        let mut record = SiteRecord::new(page.clone(), PageInfo::new(url, ""));
        record.changes.push(AnnotationRecord::Unrecognized(serde_json::json!({ "n": 1 })));

        assert!(admits(&store, &page, &record).await.unwrap());
        store.persist(&page, &record).await.unwrap();

        record.upsert_note("m", "same size");
        assert!(admits(&store, &page, &record).await.unwrap());

        record.changes.push(AnnotationRecord::Unrecognized(serde_json::json!({ "n": 2 })));
        assert!(!admits(&store, &page, &record).await.unwrap());
    }

    #[test]
    fn test_capacity_wire_format() {
        let json = serde_json::to_value(Capacity::allowed()).unwrap();
        assert_eq!(json, serde_json::json!({ "canAdd": true }));
    }
}
