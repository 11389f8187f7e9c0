//! In-memory storage backend.
//!
//! Same contract as the redb store: ids start at 1, are never reused, and
//! lookups return the lowest matching id.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{VideoRecord, VideoStore};
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<u64, VideoRecord>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records, keeping their ids.
    /// Records without an id are given fresh ones.
    pub fn with_records(records: impl IntoIterator<Item = VideoRecord>) -> Self {
        let mut inner = Inner::default();
        let mut pending = Vec::new();
        for record in records {
            match record.id {
                Some(id) => {
                    inner.next_id = inner.next_id.max(id);
                    inner.records.insert(id, record);
                }
                None => pending.push(record),
            }
        }
        for mut record in pending {
            inner.next_id += 1;
            record.id = Some(inner.next_id);
            inner.records.insert(inner.next_id, record);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> SyncResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| SyncError::Storage(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn find_by_playlist_entry_id(
        &self,
        playlist_entry_id: &str,
    ) -> SyncResult<Option<VideoRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .values()
            .find(|r| r.playlist_entry_id == playlist_entry_id)
            .cloned())
    }

    async fn find_by_video_id(&self, video_id: &str) -> SyncResult<Option<VideoRecord>> {
        let inner = self.lock()?;
        Ok(inner.records.values().find(|r| r.video_id == video_id).cloned())
    }

    async fn save(&self, mut record: VideoRecord) -> SyncResult<VideoRecord> {
        let mut inner = self.lock()?;
        let id = match record.id {
            Some(id) => id,
            None => {
                inner.next_id += 1;
                inner.next_id
            }
        };
        record.id = Some(id);
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> SyncResult<Vec<VideoRecord>> {
        let inner = self.lock()?;
        Ok(inner.records.values().cloned().collect())
    }

    async fn delete(&self, record: &VideoRecord) -> SyncResult<()> {
        if let Some(id) = record.id {
            self.lock()?.records.remove(&id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: Option<u64>, entry: &str, video: &str) -> VideoRecord {
        VideoRecord {
            id,
            playlist_entry_id: entry.to_string(),
            video_id: video.to_string(),
            title: String::new(),
            description: String::new(),
            thumbnail_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_with_records_keeps_ids_and_continues_after_max() {
        let store = MemoryStore::with_records(vec![
            record(Some(7), "e7", "v7"),
            record(None, "eN", "vN"),
            record(Some(3), "e3", "v3"),
        ]);

        let ids: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.unwrap())
            .collect();
        assert_eq!(ids, vec![3, 7, 8]);

        let saved = store.save(record(None, "e9", "v9")).await.unwrap();
        assert_eq!(saved.id, Some(9));
    }

    #[tokio::test]
    async fn test_find_and_delete() {
        let store = MemoryStore::new();
        let a = store.save(record(None, "e1", "v1")).await.unwrap();

        assert_eq!(store.find_by_playlist_entry_id("e1").await.unwrap(), Some(a.clone()));
        assert_eq!(store.find_by_video_id("v1").await.unwrap(), Some(a.clone()));

        store.delete(&a).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.backend_name(), "memory");
    }
}
