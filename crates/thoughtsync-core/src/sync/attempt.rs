use chrono::{DateTime, Utc};

use crate::api::SyncError;

/// Why a sync request did not reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The device is a producer; it never pulls.
    NotConsumer,
    /// A sync already succeeded in this session.
    AlreadySynced,
    /// Another fetch is still outstanding; this request was dropped.
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The snapshot was newer and replaced the cache.
    Updated { last_updated: Option<String> },
    /// The snapshot was fetched but was not newer; nothing was written.
    Unchanged,
    Skipped(SkipReason),
    /// The fetch failed; the cache was left untouched.
    Failed(SyncError),
}

/// One-time notice that the app is running on cached data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub message: String,
    pub reason: String,
    pub has_cached_data: bool,
}

impl Advisory {
    pub fn offline(reason: &SyncError, has_cached_data: bool) -> Self {
        let message = if has_cached_data {
            "Could not load data from the server. Using locally cached data, which may not be the latest version."
        } else {
            "Could not load data from the server and no local data is available yet."
        };
        Self {
            message: message.to_string(),
            reason: reason.to_string(),
            has_cached_data,
        }
    }
}

/// Record of one sync request.
#[derive(Debug, Clone)]
pub struct SyncAttempt {
    /// Requested URL including the cache-busting token; `None` when skipped.
    pub url: Option<String>,
    pub attempted_at: DateTime<Utc>,
    pub outcome: SyncOutcome,
    pub advisory: Option<Advisory>,
}

impl SyncAttempt {
    pub(crate) fn skipped(reason: SkipReason, attempted_at: DateTime<Utc>) -> Self {
        Self {
            url: None,
            attempted_at,
            outcome: SyncOutcome::Skipped(reason),
            advisory: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            SyncOutcome::Updated { .. } | SyncOutcome::Unchanged
        )
    }

    pub fn wrote_cache(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Updated { .. })
    }

    pub fn error(&self) -> Option<&SyncError> {
        match &self.outcome {
            SyncOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        match &self.outcome {
            SyncOutcome::Updated { last_updated } => format!(
                "Data synchronized (published {})",
                last_updated.as_deref().unwrap_or("at an unknown time")
            ),
            SyncOutcome::Unchanged => "Already up to date".to_string(),
            SyncOutcome::Skipped(SkipReason::NotConsumer) => {
                "Skipped: this device publishes, it does not pull".to_string()
            }
            SyncOutcome::Skipped(SkipReason::AlreadySynced) => {
                "Skipped: already synchronized this session".to_string()
            }
            SyncOutcome::Skipped(SkipReason::InFlight) => {
                "Skipped: a sync is already in progress".to_string()
            }
            SyncOutcome::Failed(err) => format!("Sync failed, using local data: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_classification() {
        let now = Utc::now();
        let skipped = SyncAttempt::skipped(SkipReason::InFlight, now);
        assert!(!skipped.is_success());
        assert!(!skipped.wrote_cache());
        assert!(skipped.url.is_none());

        let updated = SyncAttempt {
            url: Some("https://example.org?t=1".into()),
            attempted_at: now,
            outcome: SyncOutcome::Updated { last_updated: None },
            advisory: None,
        };
        assert!(updated.is_success());
        assert!(updated.wrote_cache());

        let failed = SyncAttempt {
            outcome: SyncOutcome::Failed(SyncError::NoData),
            ..updated
        };
        assert_eq!(failed.error(), Some(&SyncError::NoData));
        assert!(failed.summary().starts_with("Sync failed"));
    }

    #[test]
    fn test_offline_advisory_message() {
        let err = SyncError::Network("connection refused".into());
        let advisory = Advisory::offline(&err, true);
        assert!(advisory.message.contains("locally cached"));
        assert!(advisory.reason.contains("connection refused"));

        let advisory = Advisory::offline(&err, false);
        assert!(!advisory.has_cached_data);
    }
}
