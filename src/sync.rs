//! One sync pass, end to end.
//!
//! account lookup → playlist filter → item aggregation → reconciliation.
//! Passes must not overlap for the same store; the CLI runs exactly one per
//! invocation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{aggregate, select_playlists};
use crate::error::SyncResult;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::service::{AccountRef, CatalogSource};
use crate::storage::VideoStore;

/// What to sync
#[derive(Debug, Clone)]
pub struct SyncRunner {
    account: AccountRef,
    playlist_filter: Option<String>,
}

/// Summary of a completed pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub account: AccountRef,
    /// Playlists that passed the filter, in fetch order
    pub playlists: Vec<String>,
    pub fetched_items: usize,
    /// (playlist name, reason) for playlists that contributed nothing
    pub failed_playlists: Vec<(String, String)>,
    /// Playlists with items beyond the first page, which were not mirrored
    pub truncated_playlists: Vec<String>,
    pub reconcile: ReconcileReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncRunner {
    pub fn new(account: AccountRef, playlist_filter: Option<&str>) -> Self {
        Self {
            account,
            playlist_filter: playlist_filter.map(str::to_string),
        }
    }

    /// Mirror every video of a YouTube user
    pub fn for_user(username: &str, playlist_filter: Option<&str>) -> Self {
        Self::new(AccountRef::User(username.to_string()), playlist_filter)
    }

    /// Mirror every video of a YouTube channel
    pub fn for_channel(channel_id: &str, playlist_filter: Option<&str>) -> Self {
        Self::new(AccountRef::Channel(channel_id.to_string()), playlist_filter)
    }

    /// Run one pass against `store`.
    ///
    /// Failing to list the account's playlists aborts before the store is
    /// touched. Individual playlist failures only shrink the catalogue.
    pub async fn run(
        &self,
        source: &dyn CatalogSource,
        store: &dyn VideoStore,
    ) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        info!(
            "Syncing {} from {} into {} store",
            self.account,
            source.source_name(),
            store.backend_name()
        );

        let all = source.list_playlists(&self.account).await?;
        let selected = select_playlists(&all, self.playlist_filter.as_deref());
        info!(
            "Selected {} of {} playlists: {}",
            selected.len(),
            all.len(),
            selected.names().join(", ")
        );
        if selected.is_empty() && !all.is_empty() {
            warn!(
                "Playlist filter {:?} matches none of: {}; every stored video will be pruned",
                self.playlist_filter.as_deref().unwrap_or_default(),
                all.names().join(", ")
            );
        }

        let catalog = aggregate(source, &selected).await;
        let reconcile = Reconciler::new(store).reconcile(&catalog.items).await?;

        Ok(SyncReport {
            account: self.account.clone(),
            playlists: selected.names(),
            fetched_items: catalog.items.len(),
            failed_playlists: catalog.failed_playlists,
            truncated_playlists: catalog.truncated_playlists,
            reconcile,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{item, FakeSource};
    use crate::error::SyncError;
    use crate::storage::{MemoryStore, VideoRecord};

    fn two_playlist_source() -> FakeSource {
        FakeSource::default()
            .with_playlist("Uploads", "p1", vec![item("a", "v1"), item("b", "v2")])
            .with_playlist("Favorites", "p2", vec![item("c", "v3")])
    }

    #[tokio::test]
    async fn test_run_mirrors_whole_account() {
        let source = two_playlist_source();
        let store = MemoryStore::new();

        let report = SyncRunner::for_user("someone", None)
            .run(&source, &store)
            .await
            .unwrap();

        assert_eq!(report.playlists, vec!["Uploads", "Favorites"]);
        assert_eq!(report.fetched_items, 3);
        assert_eq!(report.reconcile.created, 3);
        assert!(report.finished_at >= report.started_at);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_run_with_filter_only_fetches_selected_playlist() {
        let source = two_playlist_source();
        let store = MemoryStore::new();

        let report = SyncRunner::for_channel("UC1", Some("Uploads"))
            .run(&source, &store)
            .await
            .unwrap();

        assert_eq!(source.requested(), vec!["p1"]);
        assert_eq!(report.fetched_items, 2);
        let videos: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.video_id)
            .collect();
        assert_eq!(videos, vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn test_account_failure_leaves_store_untouched() {
        let mut source = two_playlist_source();
        source.fail_account = true;
        let existing = VideoRecord::from(&item("old", "v0"));
        let store = MemoryStore::with_records(vec![existing]);

        let err = SyncRunner::for_user("someone", None)
            .run(&source, &store)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn test_failed_playlist_is_reported_and_its_records_pruned() {
        let mut source = two_playlist_source();
        source.playlists.insert("Broken", "p9");
        let store = MemoryStore::with_records(vec![VideoRecord::from(&item("gone", "v9"))]);

        let report = SyncRunner::for_user("someone", None)
            .run(&source, &store)
            .await
            .unwrap();

        assert_eq!(report.failed_playlists.len(), 1);
        assert_eq!(report.failed_playlists[0].0, "Broken");
        assert_eq!(report.reconcile.deleted, 1);
    }

    #[tokio::test]
    async fn test_filter_matching_nothing_fetches_nothing_and_prunes() {
        let source = two_playlist_source();
        let store = MemoryStore::with_records(vec![VideoRecord::from(&item("a", "v1"))]);

        // names match exactly, case included
        let report = SyncRunner::for_user("someone", Some("uploads"))
            .run(&source, &store)
            .await
            .unwrap();

        assert!(report.playlists.is_empty());
        assert_eq!(report.fetched_items, 0);
        assert!(source.requested().is_empty());
        assert_eq!(report.reconcile.deleted, 1);
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
