//! Snapshot persistence for scheduler state.
//!
//! A [`SchedulerSnapshot`] captures the config, every agent profile and every
//! task record so a host can restart without losing progress. [`SnapshotStore`] writes it as
//! JSON using a temp file + rename, keeping the previous file as `.bak`.

use crate::config::SchedulerConfig;
use crate::core::agent::AgentProfile;
use crate::engine::store::TaskRecord;
use crate::{dlog_debug, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current snapshot format version.
///
/// Version 2 added the config; version 1 files are rejected on restore.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Serializable copy of the scheduler's config, agents and tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub version: u32,
    /// Config the scheduler ran under; restore reuses it.
    pub config: SchedulerConfig,
    /// Agent profiles in id order.
    pub agents: Vec<AgentProfile>,
    /// Task records in insertion order.
    pub tasks: Vec<TaskRecord>,
    /// Sequence number the next inserted task will receive.
    pub next_sequence: u64,
}

/// File-backed snapshot storage.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (~/.dojo/state.json).
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(SchedulerConfig::state_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. Returns `None` if no file exists yet.
    pub fn load(&self) -> Result<Option<SchedulerSnapshot>> {
        dlog_debug!("SnapshotStore::load path={}", self.path.display());
        if !self.path.exists() {
            dlog_debug!("Snapshot file not found");
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let snapshot: SchedulerSnapshot = serde_json::from_str(&contents)?;
        dlog_debug!(
            "Snapshot loaded: {} agents, {} tasks",
            snapshot.agents.len(),
            snapshot.tasks.len()
        );
        Ok(Some(snapshot))
    }

    /// Write the snapshot, keeping the previous version as a backup.
    pub fn save(&self, snapshot: &SchedulerSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                dlog_debug!("Creating snapshot directory: {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }

        if self.path.exists() {
            let backup_path = self.path.with_extension("json.bak");
            dlog_debug!("Creating snapshot backup: {}", backup_path.display());
            fs::copy(&self.path, &backup_path)?;
        }

        let contents = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, &self.path)?;
        dlog_debug!("Snapshot saved: {}", self.path.display());
        Ok(())
    }
}
