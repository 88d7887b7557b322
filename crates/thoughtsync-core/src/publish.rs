//! Publish path for the producer role.
//!
//! There is no upload API: publishing means exporting the local dataset to a
//! `thought-data.json` file that a person then places at the snapshot's
//! hosting location. Export is the only place `lastUpdated` is written, so the
//! publish time becomes the freshness marker consumers compare against.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::api::SyncError;
use crate::cache::CacheManager;
use crate::models::Dataset;

/// File name the hosting location expects.
pub const ARTIFACT_FILE_NAME: &str = "thought-data.json";

/// An exported snapshot ready for manual upload.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: &'static str,
    /// Pretty-printed UTF-8 JSON of `dataset`.
    pub contents: String,
    pub dataset: Dataset,
    pub exported_at: DateTime<Utc>,
}

impl Artifact {
    /// Write the artifact into `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export dir: {}", dir.display()))?;
        let path = dir.join(self.file_name);
        let tmp_path = dir.join(format!("{}.tmp", self.file_name));
        std::fs::write(&tmp_path, self.contents.as_bytes())
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to move export into place: {}", path.display()))?;
        Ok(path)
    }
}

/// Stamp the cached dataset with `now` and serialize it for upload.
///
/// The stamp never moves backwards: if the cached `lastUpdated` is not before
/// `now` (a lagging clock), the dataset is stamped one millisecond past it
/// instead. The stamped dataset is written back to the cache so the producer's local
/// copy carries the same marker as the published file. Fails with
/// `SyncError::NoData` when nothing is cached; no artifact is produced then.
pub fn export_snapshot(cache: &CacheManager, now: DateTime<Utc>) -> Result<Artifact, SyncError> {
    let Some(mut dataset) = cache.load_dataset()? else {
        return Err(SyncError::NoData);
    };

    let stamp_at = match dataset.published_at() {
        Some(previous) if previous >= now => {
            warn!(
                previous = %previous,
                now = %now,
                "Clock is behind the last publish, advancing stamp"
            );
            previous + Duration::milliseconds(1)
        }
        _ => now,
    };
    dataset.stamp(stamp_at);
    let contents = dataset.to_json_pretty()?;
    cache.save_dataset(&dataset)?;

    let stats = dataset.stats();
    info!(
        last_updated = ?dataset.last_updated,
        thoughts = stats.thoughts,
        models = stats.models,
        tags = stats.tags,
        "Exported snapshot"
    );

    Ok(Artifact {
        file_name: ARTIFACT_FILE_NAME,
        contents,
        dataset,
        exported_at: now,
    })
}

/// Read a dataset from a previously exported (or hand-edited) file.
pub fn read_artifact(path: &Path) -> Result<Dataset, SyncError> {
    let bytes = std::fs::read(path)
        .map_err(|e| SyncError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
    Dataset::from_slice(&bytes)
}
