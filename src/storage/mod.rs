//! Storage abstraction for mirrored videos.
//!
//! - [`LocalStore`]: redb file on disk (default)
//! - [`MemoryStore`]: in-process map, used for dry runs and tests
//!
//! The reconciler only sees `&dyn VideoStore`, so both behave identically from
//! its point of view.

pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::service::RemoteItem;

/// A mirrored video as persisted locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Assigned by the store on first save
    #[serde(skip)]
    pub id: Option<u64>,
    pub playlist_entry_id: String,
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
}

impl From<&RemoteItem> for VideoRecord {
    fn from(item: &RemoteItem) -> Self {
        Self {
            id: None,
            playlist_entry_id: item.playlist_entry_id.clone(),
            video_id: item.video_id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            thumbnail_url: item.thumbnail_url.clone(),
        }
    }
}

/// Persistence capability the reconciler needs.
///
/// No transaction spans several calls; each `save`/`delete` commits on its own.
/// When more than one record shares a key, lookups return the lowest id.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Human-readable backend name (e.g., "redb", "memory").
    fn backend_name(&self) -> &str;

    async fn find_by_playlist_entry_id(&self, playlist_entry_id: &str)
        -> SyncResult<Option<VideoRecord>>;

    async fn find_by_video_id(&self, video_id: &str) -> SyncResult<Option<VideoRecord>>;

    /// Create (when `id` is None) or overwrite a record. Returns it with its id set.
    async fn save(&self, record: VideoRecord) -> SyncResult<VideoRecord>;

    /// All records, ordered by id.
    async fn list_all(&self) -> SyncResult<Vec<VideoRecord>>;

    /// Delete a record. Unsaved or already-deleted records are a no-op.
    async fn delete(&self, record: &VideoRecord) -> SyncResult<()>;
}
