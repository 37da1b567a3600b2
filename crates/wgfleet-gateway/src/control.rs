//! Typed contract for the regional gateway process
//!
//! Everything wgfleet needs from a gateway fits five operations: install a
//! peer, drop a peer, answer a liveness probe, report the interface MTU
//! ceiling, and answer a fragmentation-prohibited path probe. Custom
//! implementations can shell out to the tunnel daemon directly or speak to
//! a management API; tests use scripted fakes.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

/// Errors from gateway control operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    #[error("gateway request timed out")]
    Timeout,

    #[error("malformed gateway response: {0}")]
    BadResponse(String),

    #[error("gateway rejected request: {0}")]
    Rejected(String),
}

/// Result of a successful liveness probe.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    /// Round-trip latency of the probe
    pub latency: Duration,
}

/// Control surface of one regional gateway.
#[async_trait]
pub trait GatewayControl: Send + Sync {
    /// Install a peer session on the gateway.
    async fn start_peer(&self, public_key: &str, allowed_ip: Ipv4Addr) -> Result<(), GatewayError>;

    /// Drop any live session for the given public key.
    ///
    /// Dropping an unknown key is not an error; the gateway treats it as a
    /// no-op so revocation stays idempotent end to end.
    async fn drop_peer(&self, public_key: &str) -> Result<(), GatewayError>;

    /// Lightweight round-trip liveness check.
    async fn probe_liveness(&self) -> Result<Liveness, GatewayError>;

    /// Largest MTU the gateway's underlying interface advertises.
    async fn mtu_ceiling(&self) -> Result<u16, GatewayError>;

    /// Send one fragmentation-prohibited probe of `size` bytes down the
    /// tunnel path. Returns whether the probe made it through.
    async fn probe_path(&self, size: u16) -> Result<bool, GatewayError>;
}
