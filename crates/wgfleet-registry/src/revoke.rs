//! Revocation engine
//!
//! Flips the registry record to revoked, then tells every regional gateway
//! to drop the live session for that public key. The registry transition
//! is the source of truth; session drops are best-effort since an
//! unreachable gateway is already being handled by the health pipeline.

use crate::registry::PeerRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use wgfleet_gateway::GatewayControl;
use wgfleet_proto::{FleetError, PeerRecord, Region};

pub struct RevocationEngine {
    registry: PeerRegistry,
    gateways: HashMap<Region, Arc<dyn GatewayControl>>,
}

impl RevocationEngine {
    pub fn new(registry: PeerRegistry, gateways: HashMap<Region, Arc<dyn GatewayControl>>) -> Self {
        Self { registry, gateways }
    }

    /// Revoke `id`.
    ///
    /// Idempotent: revoking an already-revoked peer succeeds without
    /// touching the gateways again. `NotFound` for unknown ids. The
    /// allowed-IP stays assigned to the revoked record.
    pub async fn revoke(&self, id: &str) -> Result<PeerRecord, FleetError> {
        let outcome = self.registry.mark_revoked(id)?;

        if !outcome.newly_revoked {
            info!(peer_id = %id, "Peer already revoked, nothing to drop");
            return Ok(outcome.record);
        }

        for (region, gateway) in &self.gateways {
            if let Err(e) = gateway.drop_peer(&outcome.record.public_key).await {
                warn!(peer_id = %id, region = %region, error = %e,
                    "Failed to drop session on gateway");
            }
        }

        Ok(outcome.record)
    }
}
