//! Region health classification and failover decisions

use crate::peer::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Debounced health classification of a regional gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthClass {
    /// Responding within the latency threshold
    Healthy,
    /// Responding, but slower than the configured threshold
    Degraded,
    /// Not responding (timeouts or transport errors)
    Down,
}

/// Rolling health state for one region.
///
/// Owned exclusively by that region's prober; the failover controller only
/// ever reads snapshots of it. The classification flips only after the
/// debounce threshold of consecutive identical probe outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionHealth {
    pub region: Region,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub class: HealthClass,
}

impl RegionHealth {
    /// Initial state: assumed healthy until probes say otherwise.
    pub fn new(region: Region) -> Self {
        Self {
            region,
            last_probe_at: None,
            consecutive_failures: 0,
            consecutive_successes: 0,
            class: HealthClass::Healthy,
        }
    }
}

/// Why the controller changed (or re-asserted) the active region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverReason {
    /// First decision after startup with no persisted history
    Startup,
    /// The active region was classified down
    ActiveDown,
    /// The active region degraded while the standby was healthy
    PreferHealthy,
    /// Operator-forced re-assertion
    Forced,
}

/// A single active-region decision.
///
/// Emitted only when the resolved active region changes or on forced
/// re-assertion; timestamps are monotonically increasing within a history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverDecision {
    pub active: Region,
    pub previous: Option<Region>,
    pub reason: FailoverReason,
    pub decided_at: DateTime<Utc>,
}

impl FailoverDecision {
    /// Key used by the DNS updater to deduplicate applies of the same
    /// decision.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.active, self.decided_at.timestamp_millis())
    }
}

/// Outcome of one path-MTU tuning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtuResult {
    /// Peer id or path label the probe ran against
    pub target: String,
    /// Discovered MTU, always within [floor, interface ceiling]
    pub mtu: u16,
    pub probed_at: DateTime<Utc>,
    /// True once the binary search interval collapsed; a converged result
    /// is stable until a re-probe is explicitly requested.
    pub converged: bool,
}
