//! thoughtsync core - keeps a local copy of a published JSON knowledge base in
//! step with its read-only remote snapshot.
//!
//! Consumers pull the snapshot and cache it; producers edit the cache and
//! export it for a manual upload. The `SyncService` ties the pieces together:
//!
//! - [`api`]: snapshot source seam, HTTP client, error taxonomy
//! - [`cache`]: on-disk dataset store and per-session flags
//! - [`freshness`]: `lastUpdated` ordering
//! - [`notify`]: change notifications to registered consumers
//! - [`publish`]: export/import of `thought-data.json`
//! - [`sync`]: role detection and the sync controller

pub mod api;
pub mod cache;
pub mod config;
pub mod freshness;
pub mod models;
pub mod notify;
pub mod publish;
pub mod sync;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use api::{SnapshotClient, SnapshotSource, SyncError};
pub use cache::{CacheEntry, CacheManager};
pub use config::Config;
pub use freshness::is_newer;
pub use models::{Dataset, DatasetStats};
pub use notify::{DeliveryReport, NotificationDispatcher, Refreshable};
pub use publish::{Artifact, ARTIFACT_FILE_NAME};
pub use sync::{Advisory, PollHandle, Role, SkipReason, SyncAttempt, SyncOutcome, SyncService};
