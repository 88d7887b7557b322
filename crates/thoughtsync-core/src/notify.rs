//! Change notifications for downstream consumers.
//!
//! Views and list renderers implement `Refreshable` and register with the
//! `NotificationDispatcher`. Whenever the cached dataset is replaced, every
//! registered consumer is refreshed with the new read-only snapshot.
//!
//! Delivery is best effort: a consumer that returns an error or panics is
//! logged and skipped, and the remaining consumers still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::{debug, warn};

use crate::models::Dataset;

/// Something that can redraw itself from a fresh dataset.
pub trait Refreshable: Send + Sync {
    fn refresh(&self, dataset: &Dataset) -> Result<()>;
}

impl<F> Refreshable for F
where
    F: Fn(&Dataset) -> Result<()> + Send + Sync,
{
    fn refresh(&self, dataset: &Dataset) -> Result<()> {
        self(dataset)
    }
}

struct Subscriber {
    id: String,
    target: Arc<dyn Refreshable>,
}

/// Result of one fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Ids of consumers whose refresh failed.
    pub failed: Vec<String>,
}

#[derive(Default)]
pub struct NotificationDispatcher {
    subscribers: Mutex<Vec<Subscriber>>,
    // Serializes fan-outs so each consumer sees updates in commit order.
    delivery: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer. Registering an existing id replaces the previous
    /// target in place.
    pub fn subscribe(&self, consumer_id: impl Into<String>, target: Arc<dyn Refreshable>) {
        let consumer_id = consumer_id.into();
        let mut subscribers = lock(&self.subscribers);
        if let Some(existing) = subscribers.iter_mut().find(|s| s.id == consumer_id) {
            existing.target = target;
        } else {
            debug!(consumer = %consumer_id, "Consumer subscribed");
            subscribers.push(Subscriber {
                id: consumer_id,
                target,
            });
        }
    }

    pub fn unsubscribe(&self, consumer_id: &str) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != consumer_id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Refresh every registered consumer with `dataset`.
    ///
    /// Must not be called from inside a consumer's `refresh`.
    pub fn notify_changed(&self, dataset: &Arc<Dataset>) -> DeliveryReport {
        let _delivery = lock(&self.delivery);

        // Snapshot the list so consumers may (un)subscribe while being refreshed
        let targets: Vec<(String, Arc<dyn Refreshable>)> = lock(&self.subscribers)
            .iter()
            .map(|s| (s.id.clone(), Arc::clone(&s.target)))
            .collect();

        let mut report = DeliveryReport::default();
        for (id, target) in targets {
            match panic::catch_unwind(AssertUnwindSafe(|| target.refresh(dataset))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(consumer = %id, error = %e, "Consumer refresh failed");
                    report.failed.push(id);
                }
                Err(_) => {
                    warn!(consumer = %id, "Consumer refresh panicked");
                    report.failed.push(id);
                }
            }
        }

        debug!(
            delivered = report.delivered,
            failed = report.failed.len(),
            last_updated = ?dataset.last_updated,
            "Change notification dispatched"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Recorder;

    fn dataset(ts: &str) -> Arc<Dataset> {
        Arc::new(Dataset {
            last_updated: Some(ts.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_fan_out_to_all_consumers() {
        let dispatcher = NotificationDispatcher::new();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        dispatcher.subscribe("a", a.clone());
        dispatcher.subscribe("b", b.clone());

        let report = dispatcher.notify_changed(&dataset("2024-01-01T00:00:00Z"));
        assert_eq!(report.delivered, 2);
        assert!(report.failed.is_empty());
        assert_eq!(a.seen().len(), 1);
        assert_eq!(b.seen().len(), 1);
    }

    #[test]
    fn test_failing_consumer_does_not_block_others() {
        let dispatcher = NotificationDispatcher::new();
        let after = Arc::new(Recorder::default());
        dispatcher.subscribe(
            "erroring",
            Arc::new(|_: &Dataset| -> Result<()> { anyhow::bail!("view not mounted") }),
        );
        dispatcher.subscribe(
            "panicking",
            Arc::new(|_: &Dataset| -> Result<()> { panic!("render bug") }),
        );
        dispatcher.subscribe("after", after.clone());

        let report = dispatcher.notify_changed(&dataset("2024-01-01T00:00:00Z"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["erroring".to_string(), "panicking".to_string()]);
        assert_eq!(after.seen().len(), 1);
    }

    #[test]
    fn test_per_consumer_order_preserved() {
        let dispatcher = NotificationDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe("list", recorder.clone());

        for ts in ["2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z", "2024-01-03T00:00:00Z"] {
            dispatcher.notify_changed(&dataset(ts));
        }

        let seen: Vec<String> = recorder.seen().into_iter().flatten().collect();
        assert_eq!(
            seen,
            vec!["2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z", "2024-01-03T00:00:00Z"]
        );
    }

    #[test]
    fn test_resubscribe_replaces_and_unsubscribe_removes() {
        let dispatcher = NotificationDispatcher::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        dispatcher.subscribe("view", first.clone());
        dispatcher.subscribe("view", second.clone());
        assert_eq!(dispatcher.subscriber_count(), 1);

        dispatcher.notify_changed(&dataset("2024-01-01T00:00:00Z"));
        assert!(first.seen().is_empty());
        assert_eq!(second.seen().len(), 1);

        assert!(dispatcher.unsubscribe("view"));
        assert!(!dispatcher.unsubscribe("view"));
        assert_eq!(dispatcher.notify_changed(&dataset("2024-01-02T00:00:00Z")).delivered, 0);
    }
}
