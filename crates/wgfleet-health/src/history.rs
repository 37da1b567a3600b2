//! Durable failover history
//!
//! Decisions and the latest per-region health survive restarts so a
//! restarted controller resumes from the last known active region instead
//! of re-deciding from scratch. Unlike the peer registry, a corrupt
//! history file is not fatal: it is diagnostics, so the log starts fresh
//! with a warning.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};
use wgfleet_proto::{FailoverDecision, FleetError, RegionHealth, SCHEMA_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FailoverState {
    schema_version: u32,
    decisions: Vec<FailoverDecision>,
    region_health: Vec<RegionHealth>,
}

impl FailoverState {
    fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            decisions: Vec::new(),
            region_health: Vec::new(),
        }
    }
}

/// Append-style store for failover decisions and last-known region health.
pub struct FailoverLog {
    path: PathBuf,
    state: FailoverState,
}

impl FailoverLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match Self::load(&path) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failover history unreadable, starting fresh");
                FailoverState::empty()
            }
        };
        Self { path, state }
    }

    fn load(path: &PathBuf) -> Result<FailoverState, FleetError> {
        if !path.exists() {
            return Ok(FailoverState::empty());
        }
        let json = fs::read_to_string(path)?;
        let state: FailoverState =
            serde_json::from_str(&json).map_err(|e| FleetError::Persist(e.to_string()))?;
        if state.schema_version > SCHEMA_VERSION {
            return Err(FleetError::Persist(format!(
                "history schema {} newer than supported {}",
                state.schema_version, SCHEMA_VERSION
            )));
        }
        debug!(decisions = state.decisions.len(), "Loaded failover history");
        Ok(state)
    }

    pub fn last_decision(&self) -> Option<&FailoverDecision> {
        self.state.decisions.last()
    }

    pub fn decisions(&self) -> &[FailoverDecision] {
        &self.state.decisions
    }

    pub fn region_health(&self) -> &[RegionHealth] {
        &self.state.region_health
    }

    /// Append a decision and persist.
    pub fn append_decision(&mut self, decision: FailoverDecision) -> Result<(), FleetError> {
        self.state.decisions.push(decision);
        self.persist()
    }

    /// Replace the stored health snapshot for the region and persist.
    pub fn record_health(&mut self, health: RegionHealth) -> Result<(), FleetError> {
        self.state
            .region_health
            .retain(|h| h.region != health.region);
        self.state.region_health.push(health);
        self.persist()
    }

    fn persist(&self) -> Result<(), FleetError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)
            .map_err(|e| FleetError::Persist(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
