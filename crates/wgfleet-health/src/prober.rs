//! Per-region health probing tasks

use crate::tracker::{ProbeOutcome, RegionHealthTracker};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wgfleet_gateway::GatewayControl;
use wgfleet_proto::{Region, RegionHealth};

/// Probe scheduling and classification thresholds.
#[derive(Debug, Clone)]
pub struct ProberConfig {
    pub interval: Duration,
    pub probe_timeout: Duration,
    /// Latency above this marks a successful probe as degraded
    pub degraded_latency: Duration,
    /// Consecutive identical outcomes required to flip classification
    pub debounce: u32,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            degraded_latency: Duration::from_millis(750),
            debounce: 3,
        }
    }
}

/// A probe tick's report to the failover controller.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub region: Region,
    pub health: RegionHealth,
    /// Set when this tick flipped the debounced classification
    pub class_changed: bool,
}

/// Owns one probing task per region.
///
/// Tasks are scheduled independently so a hung probe against one region
/// never delays the other; reports funnel into a single channel consumed
/// by the controller in arrival order.
pub struct HealthProber {
    tasks: Vec<JoinHandle<()>>,
}

impl HealthProber {
    pub fn spawn(
        gateways: HashMap<Region, Arc<dyn GatewayControl>>,
        config: ProberConfig,
        reports: mpsc::Sender<HealthReport>,
    ) -> Self {
        let tasks = gateways
            .into_iter()
            .map(|(region, gateway)| {
                let config = config.clone();
                let reports = reports.clone();
                tokio::spawn(probe_loop(region, gateway, config, reports))
            })
            .collect();
        Self { tasks }
    }

    /// Abort all probe tasks.
    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

async fn probe_loop(
    region: Region,
    gateway: Arc<dyn GatewayControl>,
    config: ProberConfig,
    reports: mpsc::Sender<HealthReport>,
) {
    let mut tracker = RegionHealthTracker::new(region, config.debounce);
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(region = %region, interval_ms = config.interval.as_millis() as u64, "Health prober started");

    loop {
        ticker.tick().await;

        let outcome = match tokio::time::timeout(config.probe_timeout, gateway.probe_liveness())
            .await
        {
            Ok(Ok(liveness)) => {
                if liveness.latency > config.degraded_latency {
                    debug!(region = %region, latency_ms = liveness.latency.as_millis() as u64,
                        "Probe slow");
                    ProbeOutcome::Degraded
                } else {
                    ProbeOutcome::Healthy
                }
            }
            // Any error counts as failure: ambiguity defaults to distrust
            Ok(Err(e)) => {
                debug!(region = %region, error = %e, "Probe failed");
                ProbeOutcome::Down
            }
            Err(_) => {
                debug!(region = %region, "Probe timed out");
                ProbeOutcome::Down
            }
        };

        let changed = tracker.observe(outcome, Utc::now());
        if let Some(class) = changed {
            warn!(region = %region, class = ?class, "Region classification changed");
        }

        let report = HealthReport {
            region,
            health: tracker.health().clone(),
            class_changed: changed.is_some(),
        };
        if reports.send(report).await.is_err() {
            // Controller gone; stop probing
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wgfleet_gateway::{GatewayError, Liveness};
    use wgfleet_proto::HealthClass;

    /// Gateway that fails every probe.
    struct DeadGateway;

    #[async_trait]
    impl GatewayControl for DeadGateway {
        async fn start_peer(&self, _: &str, _: Ipv4Addr) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn drop_peer(&self, _: &str) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn probe_liveness(&self) -> Result<Liveness, GatewayError> {
            Err(GatewayError::Unreachable("dead".into()))
        }
        async fn mtu_ceiling(&self) -> Result<u16, GatewayError> {
            Ok(1500)
        }
        async fn probe_path(&self, _: u16) -> Result<bool, GatewayError> {
            Ok(true)
        }
    }

    /// Gateway whose probes hang forever.
    struct HangingGateway {
        probes: AtomicU32,
    }

    #[async_trait]
    impl GatewayControl for HangingGateway {
        async fn start_peer(&self, _: &str, _: Ipv4Addr) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn drop_peer(&self, _: &str) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn probe_liveness(&self) -> Result<Liveness, GatewayError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
        async fn mtu_ceiling(&self) -> Result<u16, GatewayError> {
            Ok(1500)
        }
        async fn probe_path(&self, _: u16) -> Result<bool, GatewayError> {
            Ok(true)
        }
    }

    /// Gateway answering instantly.
    struct LiveGateway;

    #[async_trait]
    impl GatewayControl for LiveGateway {
        async fn start_peer(&self, _: &str, _: Ipv4Addr) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn drop_peer(&self, _: &str) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn probe_liveness(&self) -> Result<Liveness, GatewayError> {
            Ok(Liveness {
                latency: Duration::from_millis(5),
            })
        }
        async fn mtu_ceiling(&self) -> Result<u16, GatewayError> {
            Ok(1500)
        }
        async fn probe_path(&self, _: u16) -> Result<bool, GatewayError> {
            Ok(true)
        }
    }

    fn fast_config() -> ProberConfig {
        ProberConfig {
            interval: Duration::from_millis(100),
            probe_timeout: Duration::from_millis(50),
            degraded_latency: Duration::from_millis(20),
            debounce: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_debounce_to_down() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut gateways: HashMap<Region, Arc<dyn GatewayControl>> = HashMap::new();
        gateways.insert(Region::West, Arc::new(DeadGateway));
        let prober = HealthProber::spawn(gateways, fast_config(), tx);

        let mut last = None;
        for _ in 0..3 {
            last = rx.recv().await;
        }
        let report = last.unwrap();
        assert_eq!(report.health.class, HealthClass::Down);
        assert!(report.class_changed);
        prober.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_region_does_not_block_other() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut gateways: HashMap<Region, Arc<dyn GatewayControl>> = HashMap::new();
        gateways.insert(
            Region::West,
            Arc::new(HangingGateway {
                probes: AtomicU32::new(0),
            }),
        );
        gateways.insert(Region::East, Arc::new(LiveGateway));
        let prober = HealthProber::spawn(gateways, fast_config(), tx);

        // East reports must keep flowing while west probes hang
        let mut east_reports = 0;
        for _ in 0..6 {
            let report = rx.recv().await.unwrap();
            if report.region == Region::East {
                east_reports += 1;
            }
        }
        assert!(east_reports >= 3);
        prober.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_gateway_reports_healthy() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut gateways: HashMap<Region, Arc<dyn GatewayControl>> = HashMap::new();
        gateways.insert(Region::East, Arc::new(LiveGateway));
        let prober = HealthProber::spawn(gateways, fast_config(), tx);

        let report = rx.recv().await.unwrap();
        assert_eq!(report.region, Region::East);
        assert_eq!(report.health.class, HealthClass::Healthy);
        assert_eq!(report.health.consecutive_successes, 1);
        prober.shutdown();
    }
}
