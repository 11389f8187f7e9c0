//! Mirror the playlists of a YouTube user or channel into a local store.
//!
//! A sync pass lists the account's playlists, narrows them by name, fetches
//! the items of each and reconciles them against the stored records: new
//! videos are created, known ones refreshed and vanished ones deleted.

pub mod catalog;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod service;
pub mod storage;
pub mod sync;

pub use error::{SyncError, SyncResult};
