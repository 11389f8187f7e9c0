//! Local storage backend: mirrored videos in a redb file.
//!
//! Two tables:
//!   videos: record id → JSON-encoded `VideoRecord`
//!   meta:   "next_id" → next id to hand out (ids are never reused)
//!
//! Lookups by playlist entry id or video id scan `videos` in id order. A
//! mirrored catalogue is a few hundred records at most, so no secondary
//! indices are kept.

use std::path::Path;

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::{VideoRecord, VideoStore};
use crate::error::{SyncError, SyncResult};

const VIDEOS: TableDefinition<u64, &[u8]> = TableDefinition::new("videos");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_id";

pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> SyncResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let db = Database::create(path).map_err(|e| {
            SyncError::Storage(format!("failed to open redb at {}: {}", path.display(), e))
        })?;

        // Ensure tables exist
        let txn = db.begin_write()?;
        {
            txn.open_table(VIDEOS)?;
            txn.open_table(META)?;
        }
        txn.commit()?;

        Ok(Self { db })
    }

    /// Number of stored records
    pub fn count(&self) -> SyncResult<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(VIDEOS)?;
        Ok(table.len()?)
    }

    fn decode(id: u64, bytes: &[u8]) -> SyncResult<VideoRecord> {
        let mut record: VideoRecord = serde_json::from_slice(bytes)
            .map_err(|e| SyncError::Storage(format!("corrupt video record {}: {}", id, e)))?;
        record.id = Some(id);
        Ok(record)
    }

    /// First record (lowest id) matching `pred`
    fn find_first(&self, pred: impl Fn(&VideoRecord) -> bool) -> SyncResult<Option<VideoRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(VIDEOS)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            let record = Self::decode(key.value(), value.value())?;
            if pred(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl VideoStore for LocalStore {
    fn backend_name(&self) -> &str {
        "redb"
    }

    async fn find_by_playlist_entry_id(
        &self,
        playlist_entry_id: &str,
    ) -> SyncResult<Option<VideoRecord>> {
        self.find_first(|r| r.playlist_entry_id == playlist_entry_id)
    }

    async fn find_by_video_id(&self, video_id: &str) -> SyncResult<Option<VideoRecord>> {
        self.find_first(|r| r.video_id == video_id)
    }

    async fn save(&self, mut record: VideoRecord) -> SyncResult<VideoRecord> {
        let data = serde_json::to_vec(&record).map_err(SyncError::storage)?;

        let txn = self.db.begin_write()?;
        {
            let id = match record.id {
                Some(id) => id,
                None => {
                    let mut meta = txn.open_table(META)?;
                    let next = meta.get(NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
                    meta.insert(NEXT_ID_KEY, next + 1)?;
                    next
                }
            };
            let mut videos = txn.open_table(VIDEOS)?;
            videos.insert(id, data.as_slice())?;
            record.id = Some(id);
        }
        txn.commit()?;

        Ok(record)
    }

    async fn list_all(&self) -> SyncResult<Vec<VideoRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(VIDEOS)?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            records.push(Self::decode(key.value(), value.value())?);
        }
        Ok(records)
    }

    async fn delete(&self, record: &VideoRecord) -> SyncResult<()> {
        let Some(id) = record.id else {
            return Ok(());
        };
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(VIDEOS)?;
            table.remove(id)?;
        }
        txn.commit()?;
        Ok(())
    }
}
