//! Path MTU discovery by binary search
//!
//! Probes the tunnel path with fragmentation-prohibited packets, narrowing
//! the candidate range until it collapses to the largest size that gets
//! through. A probe timeout counts as a failure at that size rather than
//! being retried; the search converging downward amortizes retries.

use crate::control::{GatewayControl, GatewayError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wgfleet_proto::{FleetError, MtuResult, MTU_FLOOR};

/// Tuning parameters for one discovery run.
#[derive(Debug, Clone)]
pub struct MtuTunerConfig {
    /// Lower bound of the search range
    pub floor: u16,
    /// Timeout for a single path probe
    pub probe_timeout: Duration,
    /// Hard cap on probes per run; the search interval collapsing normally
    /// ends the run well before this
    pub max_probes: u32,
}

impl Default for MtuTunerConfig {
    fn default() -> Self {
        Self {
            floor: MTU_FLOOR,
            probe_timeout: Duration::from_secs(3),
            max_probes: 16,
        }
    }
}

/// Binary-search MTU tuner over a gateway's path probe operation.
pub struct MtuTuner {
    gateway: Arc<dyn GatewayControl>,
    config: MtuTunerConfig,
}

impl MtuTuner {
    pub fn new(gateway: Arc<dyn GatewayControl>, config: MtuTunerConfig) -> Self {
        Self { gateway, config }
    }

    /// Discover the largest viable MTU for `target`.
    ///
    /// Never probes above the ceiling advertised by the gateway interface.
    /// The floor is assumed deliverable; if even the ceiling is at or below
    /// the floor the result is the floor, already converged.
    pub async fn tune(&self, target: &str) -> Result<MtuResult, FleetError> {
        let ceiling = self
            .gateway
            .mtu_ceiling()
            .await
            .map_err(|e| FleetError::Gateway(e.to_string()))?;

        if ceiling <= self.config.floor {
            debug!(target = %target, ceiling, "Interface ceiling at or below floor, nothing to probe");
            return Ok(MtuResult {
                target: target.to_string(),
                mtu: self.config.floor,
                probed_at: Utc::now(),
                converged: true,
            });
        }

        let mut lo = self.config.floor;
        let mut hi = ceiling;
        let mut probes = 0u32;

        while lo < hi && probes < self.config.max_probes {
            let candidate = lo + (hi - lo + 1) / 2;
            probes += 1;

            match self.probe(candidate).await {
                Ok(true) => {
                    debug!(target = %target, candidate, "Probe delivered");
                    lo = candidate;
                }
                Ok(false) => {
                    debug!(target = %target, candidate, "Probe rejected");
                    hi = candidate - 1;
                }
                Err(GatewayError::Timeout) => {
                    // Timeout at this size means the packet did not fit
                    debug!(target = %target, candidate, "Probe timed out, treating as rejected");
                    hi = candidate - 1;
                }
                Err(e) => return Err(FleetError::Gateway(e.to_string())),
            }
        }

        let converged = lo == hi;
        if converged {
            info!(target = %target, mtu = lo, probes, "Path MTU converged");
        } else {
            warn!(target = %target, mtu = lo, probes, "Probe budget exhausted before convergence");
        }

        Ok(MtuResult {
            target: target.to_string(),
            mtu: lo,
            probed_at: Utc::now(),
            converged,
        })
    }

    async fn probe(&self, size: u16) -> Result<bool, GatewayError> {
        match tokio::time::timeout(self.config.probe_timeout, self.gateway.probe_path(size)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}
