//! Reconciliation of fetched items against the local store.
//!
//! For each item, in order:
//!   1. match an existing record by playlist entry id, else by video id
//!   2. create it (title and description from the item) or refresh the
//!      matched record's entry id, video id and thumbnail
//!   3. remember the record id as processed
//!
//! Afterwards every record that was not processed is deleted.
//!
//! Writes are not transactional: a storage error aborts the pass and leaves
//! whatever was already saved in place. Pruning only runs once every item has
//! been saved, so an aborted pass never deletes anything.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::service::RemoteItem;
use crate::storage::{VideoRecord, VideoStore};

/// What happened to one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// Matched, and the refreshed fields were already current
    Unchanged,
}

/// Per-pass counts. Items that hit the same record are each counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl ReconcileReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }

    /// True when the pass wrote nothing new and deleted nothing
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

pub struct Reconciler<'a> {
    store: &'a dyn VideoStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn VideoStore) -> Self {
        Self { store }
    }

    /// Run one full pass: upsert every item, then prune untouched records.
    pub async fn reconcile(&self, items: &[RemoteItem]) -> SyncResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut processed = HashSet::new();

        for item in items {
            let (id, outcome) = self.upsert(item).await?;
            processed.insert(id);
            report.record(outcome);
        }

        report.deleted = self.prune(&processed).await?;

        info!(
            "Reconciled {} items: {} created, {} updated, {} unchanged, {} deleted",
            items.len(),
            report.created,
            report.updated,
            report.unchanged,
            report.deleted
        );
        Ok(report)
    }

    async fn find_match(&self, item: &RemoteItem) -> SyncResult<Option<VideoRecord>> {
        if let Some(record) = self
            .store
            .find_by_playlist_entry_id(&item.playlist_entry_id)
            .await?
        {
            return Ok(Some(record));
        }
        self.store.find_by_video_id(&item.video_id).await
    }

    async fn upsert(&self, item: &RemoteItem) -> SyncResult<(u64, Outcome)> {
        let (record, outcome) = match self.find_match(item).await? {
            Some(existing) => {
                let mut record = existing.clone();
                record.playlist_entry_id = item.playlist_entry_id.clone();
                record.video_id = item.video_id.clone();
                record.thumbnail_url = item.thumbnail_url.clone();
                let outcome = if record == existing {
                    Outcome::Unchanged
                } else {
                    Outcome::Updated
                };
                (record, outcome)
            }
            None => (VideoRecord::from(item), Outcome::Created),
        };

        let saved = self.store.save(record).await?;
        let id = saved.id.ok_or_else(|| {
            SyncError::Storage(format!(
                "{} store returned video {} without an id",
                self.store.backend_name(),
                item.video_id
            ))
        })?;

        debug!(
            "{:?} record {} (entry {}, video {})",
            outcome, id, item.playlist_entry_id, item.video_id
        );
        Ok((id, outcome))
    }

    async fn prune(&self, processed: &HashSet<u64>) -> SyncResult<usize> {
        let mut deleted = 0;
        for record in self.store.list_all().await? {
            let keep = record.id.map_or(false, |id| processed.contains(&id));
            if !keep {
                debug!(
                    "Deleting record {:?} (video {}) no longer in the catalogue",
                    record.id, record.video_id
                );
                self.store.delete(&record).await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
