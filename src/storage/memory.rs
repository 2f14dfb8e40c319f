//! In-process store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{capacity_for, decode, AnnotationStore, Capacity, StoreError};
use crate::annotations::{PageIdentity, SiteRecord};

/// Keeps serialized records in a map so reads go through the same decoding
/// path as the durable tiers
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<PageIdentity, String>>,
    max_annotations: Option<usize>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_annotations: usize) -> Self {
        Self {
            max_annotations: Some(max_annotations),
            ..Self::default()
        }
    }

    /// Make every write fail with a transport error until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, page: &PageIdentity) -> bool {
        self.records.read().contains_key(page)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check_transport(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn persist(&self, page: &PageIdentity, record: &SiteRecord) -> Result<(), StoreError> {
        self.check_transport()?;
        let payload = serde_json::to_string(record)?;
        self.records.write().insert(page.clone(), payload);
        Ok(())
    }

    async fn load(&self, page: &PageIdentity) -> Result<Option<SiteRecord>, StoreError> {
        let payload = self.records.read().get(page).cloned();
        payload.map(|p| decode(page, &p)).transpose()
    }

    async fn delete(&self, page: &PageIdentity) -> Result<(), StoreError> {
        self.check_transport()?;
        self.records.write().remove(page);
        Ok(())
    }

    async fn can_persist(&self, _page: &PageIdentity) -> Result<Capacity, StoreError> {
        let payloads: Vec<String> = self.records.read().values().cloned().collect();
        let mut stored = 0;
        for payload in payloads {
            let record: SiteRecord = serde_json::from_str(&payload)?;
            stored += record.annotation_count();
        }
        Ok(capacity_for(stored, self.max_annotations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::PageInfo;

    fn site(url: &str) -> SiteRecord {
        let mut site = SiteRecord::new(PageIdentity::from_url(url), PageInfo::new(url, ""));
        site.upsert_note("orphan", "note without a mark");
        site
    }

    #[tokio::test]
    async fn test_round_trip_sets_identity() {
        let store = MemoryStore::new();
        let record = site("https://example.com/");

        store.persist(&record.identity, &record).await.unwrap();
        let loaded = store.load(&record.identity).await.unwrap().unwrap();

        assert_eq!(loaded.identity, record.identity);
        assert_eq!(loaded.note("orphan"), Some("note without a mark"));
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = MemoryStore::new();
        let record = site("https://example.com/");
        store.set_failing(true);

        assert!(matches!(
            store.persist(&record.identity, &record).await,
            Err(StoreError::Transport(_))
        ));
        assert!(store.is_empty());

        store.set_failing(false);
        store.persist(&record.identity, &record).await.unwrap();
        assert!(store.contains(&record.identity));
    }

    #[tokio::test]
    async fn test_zero_limit_denies() {
        let store = MemoryStore::with_limit(0);
        let page = PageIdentity::from_url("https://example.com/");

        assert!(!store.can_persist(&page).await.unwrap().can_add);
    }
}
