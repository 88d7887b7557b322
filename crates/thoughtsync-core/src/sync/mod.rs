//! Synchronization controller.
//!
//! This module provides the `SyncService`, which owns the local cache and
//! reconciles it with the remote snapshot according to the device role:
//!
//! - Consumers pull the snapshot once per session (`sync_if_consumer`) and may
//!   poll for newer publishes in the background (`poll_for_updates`).
//! - Producers edit or import the local dataset and export it for a manual
//!   upload (`record_edit`, `import_snapshot`, `export_snapshot`).
//!
//! At most one fetch is in flight per service; overlapping requests are
//! dropped rather than queued. Failures never propagate: they are reported on
//! the returned `SyncAttempt`, and the first one in a session carries an
//! `Advisory` for the user.

pub mod attempt;
pub mod controller;
pub mod role;

pub use attempt::{Advisory, SkipReason, SyncAttempt, SyncOutcome};
pub use controller::{PollHandle, SyncService};
pub use role::{determine_role, EnvironmentSignals, Role};
