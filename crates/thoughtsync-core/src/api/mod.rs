//! Remote snapshot access.
//!
//! This module provides the `SnapshotSource` seam the sync controller fetches
//! through, the reqwest-backed `SnapshotClient` that implements it against a
//! static HTTP location, and the `SyncError` taxonomy shared by the sync and
//! publish paths.
//!
//! The remote is read-only: there is no upload endpoint. Every request carries
//! a `t=<millis>` query parameter so intermediate HTTP caches never serve a
//! stale copy.

pub mod client;
pub mod error;

pub use client::{cache_busting_url, SnapshotClient, SnapshotSource};
pub use error::SyncError;
