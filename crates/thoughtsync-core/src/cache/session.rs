/// Flags scoped to a single session.
///
/// A session is one `SyncService` lifecycle: it starts at `init` and ends at
/// `reset` or process exit. Nothing here is persisted, so every full reload
/// starts with a clean guard.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Set once a consumer sync has succeeded this session ("dataLoaded").
    data_loaded: bool,
    /// Set once the offline advisory has been surfaced this session.
    advisory_shown: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            data_loaded: false,
            advisory_shown: false,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.data_loaded
    }

    pub fn mark_synced(&mut self) {
        self.data_loaded = true;
    }

    /// Claim the session's single advisory slot. Returns `true` only the first
    /// time it is called.
    pub fn claim_advisory(&mut self) -> bool {
        if self.advisory_shown {
            false
        } else {
            self.advisory_shown = true;
            true
        }
    }

    pub fn advisory_shown(&self) -> bool {
        self.advisory_shown
    }
}
