use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{cache_busting_url, SnapshotClient, SnapshotSource, SyncError};
use crate::cache::{CacheEntry, CacheManager, SessionState};
use crate::config::Config;
use crate::freshness::is_newer;
use crate::models::Dataset;
use crate::notify::NotificationDispatcher;
use crate::publish::{self, Artifact};

use super::attempt::{Advisory, SkipReason, SyncAttempt, SyncOutcome};
use super::role::{determine_role, EnvironmentSignals, Role};

/// Marks the single fetch slot as taken for as long as it lives.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Process-wide synchronization service.
///
/// Construct once with `init` (or `from_config`), share it via `Arc`, and call
/// `reset` to start a new session without rebuilding it.
pub struct SyncService {
    role: Role,
    source: Arc<dyn SnapshotSource>,
    cache: CacheManager,
    dispatcher: NotificationDispatcher,
    fetch_timeout: Duration,
    current: RwLock<Option<Arc<Dataset>>>,
    session: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl SyncService {
    /// Start a session: derive the role once and load whatever is cached.
    pub fn init(
        signals: &EnvironmentSignals,
        source: Arc<dyn SnapshotSource>,
        cache: CacheManager,
        fetch_timeout: Duration,
    ) -> Self {
        let role = determine_role(signals);
        let current = Self::load_cached(&cache);
        info!(
            role = %role,
            remote = source.base_url(),
            cached = ?current.as_ref().map(|d| d.last_updated.clone()),
            "Sync service initialized"
        );

        Self {
            role,
            source,
            cache,
            dispatcher: NotificationDispatcher::new(),
            fetch_timeout,
            current: RwLock::new(current),
            session: Mutex::new(SessionState::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Build the service from configuration with the HTTP snapshot client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = SnapshotClient::new(config.remote_url(), config.fetch_timeout())?;
        let cache = CacheManager::new(config.cache_dir()?)?;
        Ok(Self::init(
            &config.signals(),
            Arc::new(source),
            cache,
            config.fetch_timeout(),
        ))
    }

    /// Begin a new session, as a full reload would: clear the session flags
    /// and re-read the cache. Subscribers stay registered.
    pub fn reset(&self) {
        *self.session() = SessionState::new();
        let current = Self::load_cached(&self.cache);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = current;
        debug!("Sync session reset");
    }

    /// A cache that cannot be read is treated as absent; the next good
    /// snapshot replaces it.
    fn load_cached(cache: &CacheManager) -> Option<Arc<Dataset>> {
        match cache.load_dataset() {
            Ok(dataset) => dataset.map(Arc::new),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cache");
                None
            }
        }
    }

    fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Read-only snapshot of the cached dataset.
    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cache_entry(&self) -> Option<CacheEntry> {
        self.current().map(|dataset| CacheEntry {
            dataset,
            synced_this_session: self.session().is_synced(),
        })
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    // =========================================================================
    // Consumer
    // =========================================================================

    /// Pull the remote snapshot once per session.
    ///
    /// Skipped for producers and after a successful sync in this session.
    /// Failures leave the cache untouched and stay eligible for retry on the
    /// next call.
    pub async fn sync_if_consumer(&self) -> SyncAttempt {
        self.fetch_cycle(true).await
    }

    /// One poll: fetch and compare without the once-per-session guard.
    pub async fn check_for_updates(&self) -> SyncAttempt {
        self.fetch_cycle(false).await
    }

    /// Re-check the remote every `interval` in a background task.
    ///
    /// The first check happens one interval from now; the initial load is
    /// `sync_if_consumer`'s job. Ticks that overlap an outstanding fetch are
    /// dropped.
    pub fn poll_for_updates(self: &Arc<Self>, interval: Duration) -> PollHandle {
        let service = Arc::clone(self);
        let interval = if interval.is_zero() {
            Duration::from_secs(1)
        } else {
            interval
        };

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let attempt = service.check_for_updates().await;
                debug!(outcome = ?attempt.outcome, "Poll finished");
            }
        });

        info!(interval_secs = interval.as_secs_f64(), "Polling for updates");
        PollHandle { task }
    }

    async fn fetch_cycle(&self, once_per_session: bool) -> SyncAttempt {
        let attempted_at = Utc::now();

        if self.role != Role::Consumer {
            return SyncAttempt::skipped(SkipReason::NotConsumer, attempted_at);
        }
        if once_per_session && self.session().is_synced() {
            debug!("Already synced this session, skipping");
            return SyncAttempt::skipped(SkipReason::AlreadySynced, attempted_at);
        }
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            debug!("Fetch already in flight, dropping request");
            return SyncAttempt::skipped(SkipReason::InFlight, attempted_at);
        };

        let url = cache_busting_url(self.source.base_url(), attempted_at.timestamp_millis());
        let outcome = match self.fetch_dataset(&url).await {
            Ok(dataset) => self.apply_fetched(dataset),
            Err(e) => SyncOutcome::Failed(e),
        };

        let advisory = match &outcome {
            SyncOutcome::Failed(err) => {
                warn!(url = %url, error = %err, "Sync failed, keeping cached data");
                self.claim_advisory(err)
            }
            other => {
                info!(url = %url, outcome = ?other, "Sync finished");
                None
            }
        };

        SyncAttempt {
            url: Some(url),
            attempted_at,
            outcome,
            advisory,
        }
    }

    async fn fetch_dataset(&self, url: &str) -> Result<Dataset, SyncError> {
        let body = tokio::time::timeout(self.fetch_timeout, self.source.fetch(url))
            .await
            .map_err(|_| SyncError::timeout(self.fetch_timeout))??;
        Dataset::from_json(&body)
    }

    fn apply_fetched(&self, dataset: Dataset) -> SyncOutcome {
        let current = self.current();
        if !is_newer(&dataset, current.as_deref()) {
            debug!(
                fetched = ?dataset.last_updated,
                cached = ?current.as_ref().and_then(|d| d.last_updated.clone()),
                "Fetched snapshot is not newer, discarding"
            );
            self.session().mark_synced();
            return SyncOutcome::Unchanged;
        }

        match self.commit(dataset, true) {
            Ok(committed) => SyncOutcome::Updated {
                last_updated: committed.last_updated.clone(),
            },
            Err(e) => SyncOutcome::Failed(e),
        }
    }

    fn claim_advisory(&self, err: &SyncError) -> Option<Advisory> {
        if !self.session().claim_advisory() {
            return None;
        }
        Some(Advisory::offline(err, self.current().is_some()))
    }

    /// Replace the dataset, then flip the session guard, then notify, in that
    /// order. Nothing is notified if the write fails.
    fn commit(&self, dataset: Dataset, mark_synced: bool) -> Result<Arc<Dataset>, SyncError> {
        self.cache.save_dataset(&dataset)?;

        let dataset = Arc::new(dataset);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&dataset));
        if mark_synced {
            self.session().mark_synced();
        }
        self.dispatcher.notify_changed(&dataset);
        Ok(dataset)
    }

    // =========================================================================
    // Producer
    // =========================================================================

    fn require_producer(&self) -> Result<(), SyncError> {
        if self.role == Role::Producer {
            Ok(())
        } else {
            Err(SyncError::WrongRole(Role::Producer.as_str()))
        }
    }

    /// Replace the local dataset with an edited copy.
    pub fn record_edit(&self, dataset: Dataset) -> Result<Arc<Dataset>, SyncError> {
        self.require_producer()?;
        self.commit(dataset, false)
    }

    /// Replace the local dataset from a JSON file.
    ///
    /// Refuses a file that is not newer than the cache unless `force` is set.
    pub fn import_snapshot(&self, path: &Path, force: bool) -> Result<Arc<Dataset>, SyncError> {
        self.require_producer()?;
        let dataset = publish::read_artifact(path)?;
        if !force && !is_newer(&dataset, self.current().as_deref()) {
            return Err(SyncError::StaleData);
        }
        info!(path = %path.display(), last_updated = ?dataset.last_updated, "Importing snapshot");
        self.commit(dataset, false)
    }

    /// Stamp and export the local dataset for manual upload.
    pub fn export_snapshot(&self) -> Result<Artifact, SyncError> {
        self.require_producer()?;
        let artifact = publish::export_snapshot(&self.cache, Utc::now())?;

        let dataset = Arc::new(artifact.dataset.clone());
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&dataset));
        self.dispatcher.notify_changed(&dataset);
        Ok(artifact)
    }
}

/// Handle to a background poller. The task runs until `stop` is called or
/// the runtime shuts down.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}
