//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` that persists the last known
//! dataset on disk, and the in-memory `SessionState` holding the flags that
//! only live for one session (the "already synced" guard and the one-time
//! offline advisory).
//!
//! The dataset is stored whole under a single key and is only ever replaced
//! wholesale, never merged.

pub mod manager;
pub mod session;

pub use manager::{CacheEntry, CacheManager, DATASET_KEY};
pub use session::SessionState;
