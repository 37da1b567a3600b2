//! Peer credential lifecycle: key generation, the durable peer registry,
//! client config export, and revocation.
//!
//! The registry is the single writer for all peer state. Creation allocates
//! key material and an allowed-IP atomically with the registry insert;
//! revocation flips records to revoked without ever releasing the address.

pub mod export;
pub mod keys;
pub mod pool;
pub mod registry;
pub mod revoke;
pub mod store;

pub use export::{ClientConfig, ConfigExporter, ExportSettings, GatewayPublicKeys};
pub use keys::Keypair;
pub use pool::AddressPool;
pub use registry::{PeerRegistry, RevokeOutcome};
pub use revoke::RevocationEngine;
pub use store::{RegistrySnapshot, SnapshotStore};
