//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::api::{SnapshotSource, SyncError};
use crate::models::Dataset;
use crate::notify::Refreshable;

pub const FAKE_URL: &str = "https://fake.test/thought-data.json";

/// Scripted snapshot source. Queued responses are served first, then the
/// standing response repeats.
pub struct FakeSource {
    queued: Mutex<VecDeque<Result<String, SyncError>>>,
    standing: Mutex<Result<String, SyncError>>,
    urls: Mutex<Vec<String>>,
    fetch_calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeSource {
    fn with_response(response: Result<String, SyncError>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            standing: Mutex::new(response),
            urls: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn serving(body: &str) -> Self {
        Self::with_response(Ok(body.to_string()))
    }

    pub fn failing(err: SyncError) -> Self {
        Self::with_response(Err(err))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_response(&self, response: Result<String, SyncError>) {
        *self.standing.lock().unwrap() = response;
    }

    pub fn queue(&self, response: Result<String, SyncError>) {
        self.queued.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotSource for FakeSource {
    fn base_url(&self) -> &str {
        FAKE_URL
    }

    async fn fetch(&self, url: &str) -> Result<String, SyncError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.standing.lock().unwrap().clone())
    }
}

/// Consumer that records the `lastUpdated` of every dataset it is refreshed
/// with.
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<Option<String>>>,
}

impl Recorder {
    pub fn seen(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Refreshable for Recorder {
    fn refresh(&self, dataset: &Dataset) -> Result<()> {
        self.seen.lock().unwrap().push(dataset.last_updated.clone());
        Ok(())
    }
}
