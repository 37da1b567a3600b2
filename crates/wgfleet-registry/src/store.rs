//! Durable registry snapshots as versioned JSON files

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use wgfleet_proto::{FleetError, PeerRecord, Region, SCHEMA_VERSION};

/// On-disk form of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Format version; snapshots newer than the build refuse to load
    pub schema_version: u32,
    /// Active region last announced by the failover controller
    pub active_region: Region,
    pub peers: Vec<PeerRecord>,
}

/// Reads and writes registry snapshots at a fixed path.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `None` when no snapshot exists yet.
    ///
    /// An unreadable file or a schema version newer than this build is
    /// `RegistryCorruption`: the caller must latch mutations off.
    pub fn load(&self) -> Result<Option<RegistrySnapshot>, FleetError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).map_err(|e| {
            FleetError::RegistryCorruption(format!("unreadable snapshot {:?}: {}", self.path, e))
        })?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&json).map_err(|e| {
            FleetError::RegistryCorruption(format!("unparseable snapshot {:?}: {}", self.path, e))
        })?;

        if snapshot.schema_version > SCHEMA_VERSION {
            return Err(FleetError::RegistryCorruption(format!(
                "snapshot schema {} is newer than supported {}",
                snapshot.schema_version, SCHEMA_VERSION
            )));
        }

        debug!(path = ?self.path, peers = snapshot.peers.len(), "Loaded registry snapshot");
        Ok(Some(snapshot))
    }

    /// Write the snapshot. Goes through a temp file and rename so a crash
    /// mid-write never leaves a torn snapshot behind.
    pub fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), FleetError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FleetError::Persist(format!("create {:?}: {}", parent, e)))?;
        }

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| FleetError::Persist(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| FleetError::Persist(format!("write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| FleetError::Persist(format!("rename {:?}: {}", tmp, e)))?;
        Ok(())
    }
}
