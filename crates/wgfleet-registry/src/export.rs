//! Client configuration export
//!
//! Renders a peer's registry record into a portable WireGuard client
//! config. The endpoint always goes through the dynamic-DNS hostname so
//! exported configs follow failover without re-issuing; only the gateway
//! public key is region-specific, resolved through the peer's affinity.

use crate::registry::PeerRegistry;
use wgfleet_proto::{FleetError, PeerState, Region, DEFAULT_CLIENT_MTU};

/// Per-region gateway public keys baked into exported configs.
#[derive(Debug, Clone)]
pub struct GatewayPublicKeys {
    pub west: String,
    pub east: String,
}

impl GatewayPublicKeys {
    pub fn for_region(&self, region: Region) -> &str {
        match region {
            Region::West => &self.west,
            Region::East => &self.east,
        }
    }
}

/// Static rendering inputs shared by all exports.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Dynamic-DNS hostname clients connect to (never a region label)
    pub hostname: String,
    /// Gateway listen port
    pub port: u16,
    pub gateway_keys: GatewayPublicKeys,
    /// DNS server pushed to clients, if any
    pub dns: Option<String>,
    /// PersistentKeepalive seconds
    pub keepalive: u16,
}

/// A rendered client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub peer_id: String,
    /// Region the config was resolved against at export time
    pub region: Region,
    /// INI-format config ready to hand to a client
    pub contents: String,
}

/// Renders registry records into client configs.
pub struct ConfigExporter {
    registry: PeerRegistry,
    settings: ExportSettings,
}

impl ConfigExporter {
    pub fn new(registry: PeerRegistry, settings: ExportSettings) -> Self {
        Self { registry, settings }
    }

    /// Export the config for `id`.
    ///
    /// Fails with `NotFound` for unknown ids and `AlreadyRevoked` for
    /// revoked peers; revoked credentials are refused, never served.
    pub fn export(&self, id: &str) -> Result<ClientConfig, FleetError> {
        let record = self.registry.lookup(id)?;
        if record.state == PeerState::Revoked {
            return Err(FleetError::AlreadyRevoked(id.to_string()));
        }

        let region = record.region.resolve(self.registry.active_region());
        let mtu = record.mtu.unwrap_or(DEFAULT_CLIENT_MTU);

        let mut contents = String::new();
        contents.push_str("[Interface]\n");
        contents.push_str(&format!("PrivateKey = {}\n", record.private_key));
        contents.push_str(&format!("Address = {}/32\n", record.allowed_ip));
        contents.push_str(&format!("MTU = {}\n", mtu));
        if let Some(dns) = &self.settings.dns {
            contents.push_str(&format!("DNS = {}\n", dns));
        }
        contents.push_str("\n[Peer]\n");
        contents.push_str(&format!(
            "PublicKey = {}\n",
            self.settings.gateway_keys.for_region(region)
        ));
        contents.push_str(&format!(
            "Endpoint = {}:{}\n",
            self.settings.hostname, self.settings.port
        ));
        contents.push_str("AllowedIPs = 0.0.0.0/0, ::/0\n");
        contents.push_str(&format!(
            "PersistentKeepalive = {}\n",
            self.settings.keepalive
        ));

        Ok(ClientConfig {
            peer_id: record.id,
            region,
            contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::AddressPool;
    use crate::store::SnapshotStore;
    use std::collections::HashMap;
    use wgfleet_proto::RegionAffinity;

    fn setup() -> (ConfigExporter, PeerRegistry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut pools = HashMap::new();
        pools.insert(
            Region::West,
            AddressPool::new("10.8.0.0/24".parse().unwrap()),
        );
        pools.insert(
            Region::East,
            AddressPool::new("10.9.0.0/24".parse().unwrap()),
        );
        let registry = PeerRegistry::open(SnapshotStore::new(dir.path().join("peers.json")), pools);

        let exporter = ConfigExporter::new(
            registry.clone(),
            ExportSettings {
                hostname: "vpn.example.net".to_string(),
                port: 51820,
                gateway_keys: GatewayPublicKeys {
                    west: "WESTKEY".to_string(),
                    east: "EASTKEY".to_string(),
                },
                dns: Some("1.1.1.1".to_string()),
                keepalive: 25,
            },
        );
        (exporter, registry, dir)
    }

    #[test]
    fn test_export_renders_client_config() {
        let (exporter, registry, _dir) = setup();
        let record = registry.create_peer(Some(Region::West)).unwrap();

        let config = exporter.export(&record.id).unwrap();
        assert!(config.contents.contains(&record.private_key));
        assert!(config
            .contents
            .contains(&format!("Address = {}/32", record.allowed_ip)));
        assert!(config.contents.contains("Endpoint = vpn.example.net:51820"));
        assert!(config.contents.contains("PublicKey = WESTKEY"));
        assert!(config.contents.contains("DNS = 1.1.1.1"));
        assert!(config.contents.contains("PersistentKeepalive = 25"));
    }

    #[test]
    fn test_untuned_peer_gets_conservative_mtu() {
        let (exporter, registry, _dir) = setup();
        let record = registry.create_peer(None).unwrap();

        let config = exporter.export(&record.id).unwrap();
        assert!(config.contents.contains("MTU = 1280"));
    }

    #[test]
    fn test_tuned_mtu_is_rendered() {
        let (exporter, registry, _dir) = setup();
        let record = registry.create_peer(None).unwrap();
        registry.record_mtu(&record.id, 1380).unwrap();

        let config = exporter.export(&record.id).unwrap();
        assert!(config.contents.contains("MTU = 1380"));
    }

    #[test]
    fn test_export_unknown_is_not_found() {
        let (exporter, _registry, _dir) = setup();
        assert!(matches!(
            exporter.export("missing"),
            Err(FleetError::NotFound(_))
        ));
    }

    #[test]
    fn test_export_revoked_is_refused() {
        let (exporter, registry, _dir) = setup();
        let record = registry.create_peer(None).unwrap();
        registry.mark_revoked(&record.id).unwrap();

        assert!(matches!(
            exporter.export(&record.id),
            Err(FleetError::AlreadyRevoked(_))
        ));
    }

    #[test]
    fn test_both_affinity_follows_active_region() {
        let (exporter, registry, _dir) = setup();
        let record = registry.create_peer(None).unwrap();
        assert_eq!(record.region, RegionAffinity::Both);

        registry.set_active_region(Region::East).unwrap();
        let config = exporter.export(&record.id).unwrap();
        assert_eq!(config.region, Region::East);
        assert!(config.contents.contains("PublicKey = EASTKEY"));

        // Pinned affinity overrides the active region
        registry
            .update_region_affinity(&record.id, RegionAffinity::West)
            .unwrap();
        let config = exporter.export(&record.id).unwrap();
        assert!(config.contents.contains("PublicKey = WESTKEY"));
    }
}
