//! Durable peer registry
//!
//! Single writer for all peer state. Every mutating operation takes the
//! write lock, applies the change, and flushes the snapshot before
//! releasing it, so concurrent readers only ever observe pre- or
//! post-mutation state. A detected corruption latches the registry:
//! mutations fail with `RegistryCorruption` until an operator intervenes,
//! while lookups keep serving whatever state loaded.

use crate::keys::Keypair;
use crate::pool::AddressPool;
use crate::store::{RegistrySnapshot, SnapshotStore};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use wgfleet_proto::{
    FleetError, PeerRecord, PeerState, Region, RegionAffinity, SCHEMA_VERSION,
};

/// Result of a revocation attempt.
#[derive(Debug, Clone)]
pub struct RevokeOutcome {
    pub record: PeerRecord,
    /// False when the peer was already revoked (idempotent second call)
    pub newly_revoked: bool,
}

struct RegistryInner {
    peers: HashMap<String, PeerRecord>,
    by_ip: HashMap<Ipv4Addr, String>,
    active_region: Region,
    /// Set when the snapshot or the IP index can no longer be trusted
    corrupted: Option<String>,
}

/// Durable store of peer records with an allowed-IP uniqueness index.
#[derive(Clone)]
pub struct PeerRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    store: Arc<SnapshotStore>,
    pools: Arc<HashMap<Region, AddressPool>>,
}

impl PeerRegistry {
    /// Open the registry at `store`, loading any existing snapshot.
    ///
    /// A corrupt snapshot does not fail the open: the registry comes up
    /// empty with the corruption latched, so the read-independent health
    /// pipeline can keep running while mutations are refused.
    pub fn open(store: SnapshotStore, pools: HashMap<Region, AddressPool>) -> Self {
        let mut inner = RegistryInner {
            peers: HashMap::new(),
            by_ip: HashMap::new(),
            active_region: Region::West,
            corrupted: None,
        };

        match store.load() {
            Ok(Some(snapshot)) => {
                inner.active_region = snapshot.active_region;
                for record in snapshot.peers {
                    if let Some(holder) = inner.by_ip.get(&record.allowed_ip) {
                        let reason = format!(
                            "allowed-IP {} held by both {} and {}",
                            record.allowed_ip, holder, record.id
                        );
                        error!(reason = %reason, "Registry snapshot violates IP uniqueness");
                        inner.corrupted = Some(reason);
                        break;
                    }
                    inner.by_ip.insert(record.allowed_ip, record.id.clone());
                    inner.peers.insert(record.id.clone(), record);
                }
                if inner.corrupted.is_none() {
                    info!(peers = inner.peers.len(), "Registry loaded");
                }
            }
            Ok(None) => info!("No registry snapshot found, starting empty"),
            Err(e) => {
                error!(error = %e, "Registry snapshot corrupt, mutations disabled");
                inner.corrupted = Some(e.to_string());
            }
        }

        Self {
            inner: Arc::new(RwLock::new(inner)),
            store: Arc::new(store),
            pools: Arc::new(pools),
        }
    }

    /// Create a peer: generate key material, allocate the next free
    /// allowed-IP from the hinted region's pool, and insert the record.
    ///
    /// Allocation and insertion happen under one write lock and one
    /// snapshot flush; a failed flush rolls the allocation back, so a
    /// partial allocation is never observable.
    pub fn create_peer(&self, region_hint: Option<Region>) -> Result<PeerRecord, FleetError> {
        let keypair = Keypair::generate()?;

        let mut inner = self.write_guard()?;
        let region = region_hint.unwrap_or(inner.active_region);
        let pool = self
            .pools
            .get(&region)
            .ok_or_else(|| FleetError::PoolExhausted(region.to_string()))?;

        let assigned: HashSet<Ipv4Addr> = inner.by_ip.keys().copied().collect();
        let allowed_ip = pool
            .allocate(&assigned)
            .ok_or_else(|| FleetError::PoolExhausted(region.to_string()))?;

        let record = PeerRecord {
            id: uuid::Uuid::new_v4().to_string(),
            public_key: keypair.public_key,
            private_key: keypair.private_key,
            allowed_ip,
            created_at: Utc::now(),
            state: PeerState::Active,
            region: region_hint.map(RegionAffinity::from).unwrap_or(RegionAffinity::Both),
            mtu: None,
        };

        inner.by_ip.insert(allowed_ip, record.id.clone());
        inner.peers.insert(record.id.clone(), record.clone());

        if let Err(e) = self.flush(&inner) {
            // Roll the allocation back so memory matches disk
            inner.by_ip.remove(&allowed_ip);
            inner.peers.remove(&record.id);
            return Err(e);
        }

        info!(peer_id = %record.id, allowed_ip = %allowed_ip, region = %region, "Created peer");
        Ok(record)
    }

    /// Look up a peer record by id.
    pub fn lookup(&self, id: &str) -> Result<PeerRecord, FleetError> {
        let inner = self.read_guard();
        inner
            .peers
            .get(id)
            .cloned()
            .ok_or_else(|| FleetError::NotFound(id.to_string()))
    }

    /// Transition a peer to revoked. Idempotent: a second call succeeds
    /// and reports `newly_revoked: false`. The allowed-IP is retained.
    pub fn mark_revoked(&self, id: &str) -> Result<RevokeOutcome, FleetError> {
        let mut inner = self.write_guard()?;
        let record = inner
            .peers
            .get_mut(id)
            .ok_or_else(|| FleetError::NotFound(id.to_string()))?;

        if record.state == PeerState::Revoked {
            return Ok(RevokeOutcome {
                record: record.clone(),
                newly_revoked: false,
            });
        }

        record.state = PeerState::Revoked;
        let record = record.clone();
        self.flush(&inner)?;

        info!(peer_id = %id, "Revoked peer");
        Ok(RevokeOutcome {
            record,
            newly_revoked: true,
        })
    }

    /// Pin a peer to a region (or back to `Both`).
    pub fn update_region_affinity(
        &self,
        id: &str,
        region: RegionAffinity,
    ) -> Result<(), FleetError> {
        let mut inner = self.write_guard()?;
        let record = inner
            .peers
            .get_mut(id)
            .ok_or_else(|| FleetError::NotFound(id.to_string()))?;
        record.region = region;
        self.flush(&inner)?;
        Ok(())
    }

    /// Persist a converged MTU into the peer record.
    pub fn record_mtu(&self, id: &str, mtu: u16) -> Result<(), FleetError> {
        let mut inner = self.write_guard()?;
        let record = inner
            .peers
            .get_mut(id)
            .ok_or_else(|| FleetError::NotFound(id.to_string()))?;
        record.mtu = Some(mtu);
        self.flush(&inner)?;
        info!(peer_id = %id, mtu, "Recorded tuned MTU");
        Ok(())
    }

    /// All active (non-revoked) peers.
    pub fn list_active(&self) -> Vec<PeerRecord> {
        let inner = self.read_guard();
        inner
            .peers
            .values()
            .filter(|r| r.is_active())
            .cloned()
            .collect()
    }

    /// All peers, revoked included.
    pub fn list_all(&self) -> Vec<PeerRecord> {
        let inner = self.read_guard();
        inner.peers.values().cloned().collect()
    }

    /// Destroy a record entirely, releasing its allowed-IP.
    ///
    /// This is the explicit purge operation, not part of normal revocation;
    /// it discards the audit history for the peer.
    pub fn purge(&self, id: &str) -> Result<PeerRecord, FleetError> {
        let mut inner = self.write_guard()?;
        let record = inner
            .peers
            .remove(id)
            .ok_or_else(|| FleetError::NotFound(id.to_string()))?;
        inner.by_ip.remove(&record.allowed_ip);
        self.flush(&inner)?;
        warn!(peer_id = %id, allowed_ip = %record.allowed_ip, "Purged peer record");
        Ok(record)
    }

    /// Failover controller notification: exports of `Both`-affine peers
    /// resolve against this region from now on.
    pub fn set_active_region(&self, region: Region) -> Result<(), FleetError> {
        let mut inner = self.write_guard()?;
        if inner.active_region == region {
            return Ok(());
        }
        inner.active_region = region;
        self.flush(&inner)?;
        info!(region = %region, "Registry active region updated");
        Ok(())
    }

    pub fn active_region(&self) -> Region {
        self.read_guard().active_region
    }

    /// Whether mutations are currently latched off.
    pub fn is_corrupted(&self) -> bool {
        self.read_guard().corrupted.is_some()
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        // Lock poisoning only happens if a writer panicked; the data is
        // still the last consistent state, so recover the guard.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_guard(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, RegistryInner>, FleetError> {
        let guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(reason) = &guard.corrupted {
            return Err(FleetError::RegistryCorruption(reason.clone()));
        }
        Ok(guard)
    }

    fn flush(&self, inner: &RegistryInner) -> Result<(), FleetError> {
        let snapshot = RegistrySnapshot {
            schema_version: SCHEMA_VERSION,
            active_region: inner.active_region,
            peers: inner.peers.values().cloned().collect(),
        };
        self.store.save(&snapshot)
    }
}
