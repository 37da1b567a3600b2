//! Integration tests for the assembled fleet control plane

use wgfleet_cli::config::{
    DnsProviderConfig, FleetConfig, ProbeConfig, RegionConfig,
};
use wgfleet_cli::service::{Fleet, Secrets};
use wgfleet_proto::{FleetError, Region};

fn test_config() -> FleetConfig {
    FleetConfig {
        hostname: "vpn.example.net".to_string(),
        listen_port: 51820,
        client_dns: None,
        keepalive: 25,
        west: RegionConfig {
            // Unroutable test addresses; gateway installs are best-effort
            endpoint: "198.51.100.10".to_string(),
            gateway_url: "http://127.0.0.1:1".to_string(),
            gateway_public_key: "WESTKEY".to_string(),
            pool: "10.8.0.0/24".parse().unwrap(),
        },
        east: RegionConfig {
            endpoint: "203.0.113.20".to_string(),
            gateway_url: "http://127.0.0.1:1".to_string(),
            gateway_public_key: "EASTKEY".to_string(),
            pool: "10.9.0.0/24".parse().unwrap(),
        },
        dns: DnsProviderConfig {
            zone_id: "zone".to_string(),
            record_id: "record".to_string(),
            ttl: 60,
        },
        probe: ProbeConfig::default(),
    }
}

fn test_fleet(dir: &tempfile::TempDir) -> Fleet {
    Fleet::new(
        test_config(),
        Secrets {
            gateway_password: "password".to_string(),
            dns_token: "token".to_string(),
        },
        dir.path(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_create_export_revoke_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = test_fleet(&dir);

    let record = fleet.create_peer(Some(Region::West)).await.unwrap();

    let exported = fleet.export_peer(&record.id).unwrap();
    assert!(exported.contents.contains("Endpoint = vpn.example.net:51820"));
    assert!(exported.contents.contains("PublicKey = WESTKEY"));

    fleet.revoke_peer(&record.id).await.unwrap();
    assert!(matches!(
        fleet.export_peer(&record.id),
        Err(FleetError::AlreadyRevoked(_))
    ));

    // Idempotent second revoke
    fleet.revoke_peer(&record.id).await.unwrap();
}

#[tokio::test]
async fn test_export_unknown_peer() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = test_fleet(&dir);

    assert!(matches!(
        fleet.export_peer("no-such-peer"),
        Err(FleetError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_status_on_fresh_state() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = test_fleet(&dir);

    let status = fleet.status();
    assert_eq!(status.active_region, Region::West);
    assert_eq!(status.active_peers, 0);
    assert_eq!(status.revoked_peers, 0);
    assert!(!status.registry_corrupted);
    assert!(status.last_decision.is_none());
}

#[tokio::test]
async fn test_state_survives_fleet_rebuild() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let fleet = test_fleet(&dir);
        fleet.create_peer(None).await.unwrap().id
    };

    let fleet = test_fleet(&dir);
    let status = fleet.status();
    assert_eq!(status.active_peers, 1);
    assert!(fleet.export_peer(&id).is_ok());
}
