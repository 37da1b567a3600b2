//! Shared data model for the wgfleet control plane
//!
//! This crate defines the core types exchanged between the peer lifecycle
//! components (registry, exporter, revocation, MTU tuner) and the regional
//! health/failover pipeline, plus the error taxonomy surfaced to operators.

pub mod error;
pub mod health;
pub mod peer;

pub use error::FleetError;
pub use health::{FailoverDecision, FailoverReason, HealthClass, MtuResult, RegionHealth};
pub use peer::{PeerRecord, PeerState, Region, RegionAffinity};

/// Schema version stamped into every persisted snapshot.
///
/// Snapshots with a version greater than this refuse to load; lower or
/// equal versions are readable.
pub const SCHEMA_VERSION: u32 = 1;

/// Conservative client MTU used when a peer has never been tuned.
/// 1280 is the IPv6 minimum link MTU and safe on any path WireGuard runs over.
pub const DEFAULT_CLIENT_MTU: u16 = 1280;

/// Lower bound for MTU probing.
pub const MTU_FLOOR: u16 = 1280;
