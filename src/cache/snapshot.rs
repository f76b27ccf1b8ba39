//! Snapshot Persistence
//!
//! Optional JSON snapshot of live entries so a restarted process can start
//! warm. Remaining lifetimes are stored relative to the wall-clock save time.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::error::{CacheError, Result};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    value: Value,
    ttl_ms: u64,
    ttl_remaining_ms: u64,
}

fn snapshot_error(path: &Path, err: impl std::fmt::Display) -> CacheError {
    CacheError::Snapshot(format!("{}: {}", path.display(), err))
}

impl CacheStore {
    // == Save Snapshot ==
    /// Writes every live entry to `path` and returns how many were saved.
    ///
    /// The file is written next to `path` first and renamed into place.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let entries: Vec<SnapshotEntry> = self
            .export_live()
            .into_iter()
            .map(|(key, value, ttl, remaining)| SnapshotEntry {
                key,
                value,
                ttl_ms: ttl.as_millis() as u64,
                ttl_remaining_ms: remaining.as_millis() as u64,
            })
            .collect();
        let count = entries.len();

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            entries,
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| snapshot_error(parent, err))?;
        }
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|err| snapshot_error(&staging, err))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|err| snapshot_error(path, err))?;

        info!(path = %path.display(), entries = count, "saved cache snapshot");
        Ok(count)
    }

    // == Load Snapshot ==
    /// Restores entries from `path`, skipping those that expired while the
    /// snapshot sat on disk. Returns how many were restored.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| snapshot_error(path, err))?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|err| snapshot_error(path, err))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(snapshot_error(
                path,
                format!("unsupported snapshot version {}", snapshot.version),
            ));
        }

        let elapsed = (Utc::now() - snapshot.saved_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        let mut restored = 0;
        for entry in snapshot.entries {
            let remaining = Duration::from_millis(entry.ttl_remaining_ms);
            let Some(remaining) = remaining.checked_sub(elapsed).filter(|r| !r.is_zero()) else {
                debug!(key = %entry.key, "skipping snapshot entry that expired on disk");
                continue;
            };
            if crate::cache::key::validate_key(&entry.key).is_err() {
                debug!(key = %entry.key, "skipping snapshot entry with invalid key");
                continue;
            }

            let ttl = Duration::from_millis(entry.ttl_ms);
            self.restore(entry.key, entry.value, ttl, remaining);
            restored += 1;
        }

        info!(path = %path.display(), entries = restored, "loaded cache snapshot");
        Ok(restored)
    }
}
