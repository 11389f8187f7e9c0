//! Playlist selection and item aggregation.
//!
//! Narrows an account's playlists by the configured name filter, then fetches
//! every selected playlist and concatenates the items. A playlist that fails
//! contributes nothing; the rest of the catalogue still comes through.

use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::service::{CatalogSource, PlaylistSet, RemoteItem};

/// Keep only playlists named in `filter` (comma-separated).
///
/// A missing or blank filter keeps everything. Names not present in
/// `playlists` are ignored.
pub fn select_playlists(playlists: &PlaylistSet, filter: Option<&str>) -> PlaylistSet {
    let wanted: Vec<&str> = filter
        .map(|f| f.split(',').map(str::trim).filter(|n| !n.is_empty()).collect())
        .unwrap_or_default();

    if wanted.is_empty() {
        return playlists.clone();
    }

    for name in wanted.iter().filter(|n| !playlists.contains(n)) {
        debug!("Playlist filter names unknown playlist '{}'", name);
    }

    playlists
        .iter()
        .filter(|(name, _)| wanted.contains(name))
        .collect()
}

/// Everything fetched for one sync pass
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// All items, in playlist order then page order. May repeat videos.
    pub items: Vec<RemoteItem>,
    /// Playlists whose fetch failed (name, reason)
    pub failed_playlists: Vec<(String, String)>,
    /// Playlists with more items than the single fetched page
    pub truncated_playlists: Vec<String>,
}

/// Fetch every selected playlist, one after another, and merge the items.
pub async fn aggregate(source: &dyn CatalogSource, playlists: &PlaylistSet) -> Catalog {
    let mut catalog = Catalog::default();

    for (name, playlist_id) in playlists.iter() {
        match source.list_playlist_items(playlist_id).await {
            Ok(page) => {
                debug!("Playlist '{}' returned {} items", name, page.items.len());
                if page.truncated {
                    warn!(
                        "Playlist '{}' has more items than one page; only the first page is mirrored",
                        name
                    );
                    catalog.truncated_playlists.push(name.to_string());
                }
                catalog.items.extend(page.items);
            }
            Err(SyncError::EmptyResult(reason)) => {
                debug!("Playlist '{}' is empty: {}", name, reason);
            }
            Err(e) => {
                warn!("Skipping playlist '{}': {}", name, e);
                catalog.failed_playlists.push((name.to_string(), e.to_string()));
            }
        }
    }

    info!(
        "Fetched {} items from {} playlists",
        catalog.items.len(),
        playlists.len()
    );
    catalog
}
