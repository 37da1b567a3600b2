//! Wires the fleet components together for the CLI commands

use crate::config::FleetConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use wgfleet_dns::{CloudflareConfig, CloudflareDns, DnsUpdater, RetryPolicy};
use wgfleet_gateway::{
    GatewayControl, HttpGateway, HttpGatewayConfig, MtuTuner, MtuTunerConfig,
};
use wgfleet_health::{FailoverController, FailoverLog, HealthProber, ProberConfig};
use wgfleet_proto::{
    FailoverDecision, FleetError, MtuResult, PeerRecord, Region, RegionHealth,
};
use wgfleet_registry::{
    AddressPool, ClientConfig, ConfigExporter, ExportSettings, GatewayPublicKeys, PeerRegistry,
    RevocationEngine, SnapshotStore,
};

/// Secrets sourced from flags or the environment, never the config file.
#[derive(Clone)]
pub struct Secrets {
    pub gateway_password: String,
    pub dns_token: String,
}

/// Operator status snapshot.
pub struct StatusReport {
    pub active_region: Region,
    pub registry_corrupted: bool,
    pub active_peers: usize,
    pub revoked_peers: usize,
    pub region_health: Vec<RegionHealth>,
    pub last_decision: Option<FailoverDecision>,
}

/// The assembled fleet control plane.
pub struct Fleet {
    config: FleetConfig,
    registry: PeerRegistry,
    gateways: HashMap<Region, Arc<dyn GatewayControl>>,
    dns: Arc<DnsUpdater>,
    state_dir: PathBuf,
}

impl Fleet {
    pub fn new(
        config: FleetConfig,
        secrets: Secrets,
        state_dir: &Path,
    ) -> Result<Self, FleetError> {
        let mut pools = HashMap::new();
        pools.insert(Region::West, AddressPool::new(config.west.pool));
        pools.insert(Region::East, AddressPool::new(config.east.pool));
        let registry = PeerRegistry::open(SnapshotStore::new(state_dir.join("peers.json")), pools);

        let mut gateways: HashMap<Region, Arc<dyn GatewayControl>> = HashMap::new();
        for (region, region_config) in [(Region::West, &config.west), (Region::East, &config.east)]
        {
            let gateway = HttpGateway::new(HttpGatewayConfig {
                base_url: region_config.gateway_url.clone(),
                password: secrets.gateway_password.clone(),
                timeout: Duration::from_secs(config.probe.timeout_secs),
            })
            .map_err(|e| FleetError::Gateway(e.to_string()))?;
            gateways.insert(region, Arc::new(gateway));
        }

        let api = CloudflareDns::new(CloudflareConfig {
            api_token: secrets.dns_token,
            zone_id: config.dns.zone_id.clone(),
            record_id: config.dns.record_id.clone(),
            api_base: None,
            timeout: Duration::from_secs(10),
        })
        .map_err(|e| FleetError::DnsApplyFailure(e.to_string()))?;

        let mut endpoints = HashMap::new();
        endpoints.insert(Region::West, config.west.endpoint.clone());
        endpoints.insert(Region::East, config.east.endpoint.clone());
        let dns = Arc::new(DnsUpdater::new(
            Arc::new(api),
            config.hostname.clone(),
            config.dns.ttl,
            endpoints,
            RetryPolicy::default(),
        ));

        Ok(Self {
            config,
            registry,
            gateways,
            dns,
            state_dir: state_dir.to_path_buf(),
        })
    }

    fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            hostname: self.config.hostname.clone(),
            port: self.config.listen_port,
            gateway_keys: GatewayPublicKeys {
                west: self.config.west.gateway_public_key.clone(),
                east: self.config.east.gateway_public_key.clone(),
            },
            dns: self.config.client_dns.clone(),
            keepalive: self.config.keepalive,
        }
    }

    fn failover_log(&self) -> FailoverLog {
        FailoverLog::open(self.state_dir.join("failover.json"))
    }

    fn prober_config(&self) -> ProberConfig {
        ProberConfig {
            interval: Duration::from_secs(self.config.probe.interval_secs),
            probe_timeout: Duration::from_secs(self.config.probe.timeout_secs),
            degraded_latency: Duration::from_millis(self.config.probe.degraded_latency_ms),
            debounce: self.config.probe.debounce,
        }
    }

    /// Create a peer and install its session on the relevant gateways.
    pub async fn create_peer(&self, region: Option<Region>) -> Result<PeerRecord, FleetError> {
        let record = self.registry.create_peer(region)?;

        let targets: Vec<Region> = match region {
            Some(r) => vec![r],
            None => vec![Region::West, Region::East],
        };
        for target in targets {
            if let Some(gateway) = self.gateways.get(&target) {
                if let Err(e) = gateway.start_peer(&record.public_key, record.allowed_ip).await {
                    // The record is authoritative; the gateway converges later
                    warn!(peer_id = %record.id, region = %target, error = %e,
                        "Failed to install peer on gateway");
                }
            }
        }
        Ok(record)
    }

    pub fn export_peer(&self, id: &str) -> Result<ClientConfig, FleetError> {
        ConfigExporter::new(self.registry.clone(), self.export_settings()).export(id)
    }

    pub async fn revoke_peer(&self, id: &str) -> Result<PeerRecord, FleetError> {
        RevocationEngine::new(self.registry.clone(), self.gateways.clone())
            .revoke(id)
            .await
    }

    /// Tune the path MTU for a peer and persist the converged value.
    pub async fn tune_mtu(&self, id: &str) -> Result<MtuResult, FleetError> {
        let record = self.registry.lookup(id)?;
        let region = record.region.resolve(self.registry.active_region());
        let gateway = self
            .gateways
            .get(&region)
            .ok_or_else(|| FleetError::Gateway(format!("no gateway for region {}", region)))?;

        let tuner = MtuTuner::new(gateway.clone(), MtuTunerConfig::default());
        let result = tuner.tune(id).await?;

        if result.converged {
            self.registry.record_mtu(id, result.mtu)?;
        } else {
            warn!(peer_id = %id, mtu = result.mtu,
                "MTU probe did not converge; not persisting");
        }
        Ok(result)
    }

    /// Operator-forced failover to `region`.
    pub async fn force_failover(&self, region: Region) -> Result<FailoverDecision, FleetError> {
        let mut controller =
            FailoverController::new(self.dns.clone(), self.registry.clone(), self.failover_log());
        controller.force(region).await
    }

    pub fn status(&self) -> StatusReport {
        let log = self.failover_log();
        let all = self.registry.list_all();
        let active_peers = all.iter().filter(|r| r.is_active()).count();

        StatusReport {
            active_region: self.registry.active_region(),
            registry_corrupted: self.registry.is_corrupted(),
            active_peers,
            revoked_peers: all.len() - active_peers,
            region_health: log.region_health().to_vec(),
            last_decision: log.last_decision().cloned(),
        }
    }

    /// Long-running mode: probe both regions and run the failover
    /// controller until interrupted.
    pub async fn run(&self) -> Result<(), FleetError> {
        let (tx, rx) = mpsc::channel(32);
        let prober = HealthProber::spawn(self.gateways.clone(), self.prober_config(), tx);
        let controller =
            FailoverController::new(self.dns.clone(), self.registry.clone(), self.failover_log());

        info!("Fleet controller running; press Ctrl-C to stop");
        tokio::select! {
            _ = controller.run(rx) => {}
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Shutting down");
            }
        }
        prober.shutdown();
        Ok(())
    }
}
