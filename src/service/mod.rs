pub mod youtube;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// Which remote account a catalogue belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum AccountRef {
    /// Legacy YouTube username (`forUsername`)
    User(String),
    /// Channel id (`UC...`)
    Channel(String),
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountRef::User(name) => write!(f, "user:{}", name),
            AccountRef::Channel(id) => write!(f, "channel:{}", id),
        }
    }
}

/// Playlists of an account, name -> playlist id, in the order the remote listed them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSet {
    entries: Vec<(String, String)>,
}

impl PlaylistSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a playlist, keeping the first-seen position
    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        let name = name.into();
        let id = id.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = id,
            None => self.entries.push((name, id)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for PlaylistSet {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut set = PlaylistSet::new();
        for (name, id) in iter {
            set.insert(name, id);
        }
        set
    }
}

/// One playlist entry as fetched from the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Id of the (playlist, video) membership; changes when re-added
    pub playlist_entry_id: String,
    /// Id of the underlying video, shared across playlists
    pub video_id: String,
    pub title: String,
    pub description: String,
    /// Highest-resolution thumbnail offered
    pub thumbnail_url: String,
}

/// A single fetched page of playlist items
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    pub items: Vec<RemoteItem>,
    /// The remote holds more items than this page returned.
    /// Only the first page is ever fetched.
    pub truncated: bool,
}

/// Remote video catalogue.
///
/// Implementations are a pure I/O boundary: no caching, no retries. Every
/// failure comes back as an `Err`.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable backend name (e.g., "youtube").
    fn source_name(&self) -> &str;

    /// Playlists related to a user or channel.
    async fn list_playlists(&self, account: &AccountRef) -> SyncResult<PlaylistSet>;

    /// First page of items in a playlist.
    async fn list_playlist_items(&self, playlist_id: &str) -> SyncResult<PlaylistPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_set_keeps_order() {
        let set: PlaylistSet = vec![("uploads", "UU1"), ("likes", "LL1"), ("favorites", "FL1")]
            .into_iter()
            .collect();

        assert_eq!(set.names(), vec!["uploads", "likes", "favorites"]);
        assert_eq!(set.get("likes"), Some("LL1"));
        assert!(!set.contains("watchLater"));
    }

    #[test]
    fn test_playlist_set_insert_replaces_in_place() {
        let mut set = PlaylistSet::new();
        set.insert("uploads", "UU1");
        set.insert("likes", "LL1");
        set.insert("uploads", "UU2");

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next(), Some(("uploads", "UU2")));
    }

    #[test]
    fn test_account_ref_display() {
        assert_eq!(AccountRef::User("bob".into()).to_string(), "user:bob");
        assert_eq!(AccountRef::Channel("UC9".into()).to_string(), "channel:UC9");
    }
}
