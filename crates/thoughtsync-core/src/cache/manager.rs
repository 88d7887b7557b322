use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::Dataset;

/// Storage key of the cached dataset.
pub const DATASET_KEY: &str = "structuredThoughtAssistant";

/// The cached dataset together with the session guard, as seen by readers.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub dataset: Arc<Dataset>,
    pub synced_this_session: bool,
}

/// File-backed key/value store. Each key maps to one JSON file in the cache
/// directory.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    /// Read the raw bytes stored under `name`.
    pub fn load_raw(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;
        Ok(Some(contents))
    }

    /// Replace the value stored under `name`.
    ///
    /// The bytes go to a sibling temp file first and are renamed into place,
    /// so a reader sees either the old value or the new one.
    pub fn save_raw(&self, name: &str, contents: &[u8]) -> Result<()> {
        let path = self.cache_path(name);
        let tmp_path = self.cache_dir.join(format!("{}.json.tmp", name));

        std::fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        if let Err(rename_err) = std::fs::rename(&tmp_path, &path) {
            if path.exists() {
                std::fs::remove_file(&path)?;
                std::fs::rename(&tmp_path, &path)
                    .with_context(|| format!("Failed to replace cache file: {}", name))?;
            } else {
                return Err(rename_err)
                    .with_context(|| format!("Failed to replace cache file: {}", name));
            }
        }
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.cache_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", name))?;
        }
        Ok(())
    }

    // ===== Dataset =====

    pub fn load_dataset(&self) -> Result<Option<Dataset>> {
        let Some(contents) = self.load_raw(DATASET_KEY)? else {
            return Ok(None);
        };

        let dataset = Dataset::from_slice(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", DATASET_KEY))?;
        debug!(last_updated = ?dataset.last_updated, "Loaded cached dataset");
        Ok(Some(dataset))
    }

    pub fn save_dataset(&self, dataset: &Dataset) -> Result<()> {
        let contents = serde_json::to_vec_pretty(dataset)?;
        self.save_raw(DATASET_KEY, &contents)?;
        debug!(last_updated = ?dataset.last_updated, bytes = contents.len(), "Saved dataset to cache");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
