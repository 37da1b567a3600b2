//! Failover controller
//!
//! Consumes health reports one at a time and decides which region the
//! dynamic-DNS record should point at. Transitions are deliberately rare:
//! the active region is kept unless it is down, or degraded while the
//! standby is healthy. Two degraded regions never flap, and a region
//! classified down is never selected.

use crate::history::FailoverLog;
use crate::prober::HealthReport;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use wgfleet_dns::DnsUpdater;
use wgfleet_proto::{
    FailoverDecision, FailoverReason, FleetError, HealthClass, Region,
};
use wgfleet_registry::PeerRegistry;

/// Controller position in the two-region state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Active(Region),
    /// Both regions down: no DNS change, last active kept for diagnostics
    BothDegraded { last_active: Region },
}

pub struct FailoverController {
    state: ControllerState,
    health: HashMap<Region, HealthClass>,
    dns: Arc<DnsUpdater>,
    registry: PeerRegistry,
    log: FailoverLog,
}

impl FailoverController {
    /// Build a controller, resuming from persisted history when present.
    pub fn new(dns: Arc<DnsUpdater>, registry: PeerRegistry, log: FailoverLog) -> Self {
        let initial = log
            .last_decision()
            .map(|d| d.active)
            .unwrap_or(Region::West);
        // Unprobed regions are assumed healthy until counters say
        // otherwise; persisted classifications carry over a restart
        let mut health = HashMap::new();
        health.insert(Region::West, HealthClass::Healthy);
        health.insert(Region::East, HealthClass::Healthy);
        for stored in log.region_health() {
            health.insert(stored.region, stored.class);
        }

        info!(active = %initial, "Failover controller starting");
        Self {
            state: ControllerState::Active(initial),
            health,
            dns,
            registry,
            log,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Active region, unless both regions are down.
    pub fn active_region(&self) -> Option<Region> {
        match self.state {
            ControllerState::Active(region) => Some(region),
            ControllerState::BothDegraded { .. } => None,
        }
    }

    /// Consume reports until the channel closes.
    pub async fn run(mut self, mut reports: mpsc::Receiver<HealthReport>) {
        while let Some(report) = reports.recv().await {
            self.handle_report(report).await;
        }
        info!("Report channel closed, failover controller stopping");
    }

    /// Fold one report in and re-evaluate. Safe to call on every probe
    /// tick; evaluation is an idempotent no-op when nothing changed.
    pub async fn handle_report(&mut self, report: HealthReport) {
        if report.class_changed {
            if let Err(e) = self.log.record_health(report.health.clone()) {
                warn!(error = %e, "Failed to persist region health");
            }
        }
        self.health.insert(report.region, report.health.class);
        self.evaluate().await;
    }

    async fn evaluate(&mut self) {
        match self.state {
            ControllerState::Active(current) => {
                let standby = current.other();
                let current_class = self.class(current);
                let standby_class = self.class(standby);

                match (current_class, standby_class) {
                    (HealthClass::Down, HealthClass::Down) => {
                        error!(last_active = %current,
                            "Both regions down; keeping DNS unchanged");
                        self.state = ControllerState::BothDegraded {
                            last_active: current,
                        };
                    }
                    (HealthClass::Down, _) => {
                        self.transition(standby, FailoverReason::ActiveDown).await;
                    }
                    (HealthClass::Degraded, HealthClass::Healthy) => {
                        self.transition(standby, FailoverReason::PreferHealthy).await;
                    }
                    // Healthy active, or both merely degraded: hold position
                    _ => {}
                }
            }
            ControllerState::BothDegraded { last_active } => {
                let last_class = self.class(last_active);
                let other = last_active.other();
                let other_class = self.class(other);

                if last_class != HealthClass::Down {
                    // DNS still points here; no decision needed to resume
                    info!(region = %last_active, "Last active region recovered");
                    self.state = ControllerState::Active(last_active);
                } else if other_class != HealthClass::Down {
                    self.state = ControllerState::Active(last_active);
                    self.transition(other, FailoverReason::ActiveDown).await;
                }
            }
        }
    }

    /// Operator-forced re-assertion of a region.
    ///
    /// Refused when the target is classified down; forcing the current
    /// active region re-applies the DNS record with a fresh decision.
    pub async fn force(&mut self, region: Region) -> Result<FailoverDecision, FleetError> {
        if self.class(region) == HealthClass::Down {
            return Err(FleetError::FailoverRefused(format!(
                "region {} is classified down",
                region
            )));
        }
        let decision = self.emit(region, FailoverReason::Forced).await;
        self.state = ControllerState::Active(region);
        Ok(decision)
    }

    async fn transition(&mut self, to: Region, reason: FailoverReason) {
        let decision = self.emit(to, reason).await;
        self.state = ControllerState::Active(decision.active);
    }

    /// Emit exactly one decision: persist it, drive the DNS updater, and
    /// notify the registry. DNS and registry failures are absorbed; the
    /// decision stands and the health pipeline keeps running.
    async fn emit(&mut self, to: Region, reason: FailoverReason) -> FailoverDecision {
        let previous = self.active_region();

        // Keep decision timestamps strictly monotonic within the history
        let mut decided_at = Utc::now();
        if let Some(last) = self.log.last_decision() {
            if decided_at <= last.decided_at {
                decided_at = last.decided_at + ChronoDuration::milliseconds(1);
            }
        }

        let decision = FailoverDecision {
            active: to,
            previous,
            reason,
            decided_at,
        };

        info!(
            active = %decision.active,
            previous = ?decision.previous.map(|r| r.to_string()),
            reason = ?decision.reason,
            "Failover decision"
        );

        if let Err(e) = self.log.append_decision(decision.clone()) {
            warn!(error = %e, "Failed to persist failover decision");
        }
        if let Err(e) = self.dns.apply(&decision).await {
            // Prior DNS record remains authoritative until a later apply
            error!(error = %e, "DNS apply failed");
        }
        if let Err(e) = self.registry.set_active_region(to) {
            warn!(error = %e, "Registry rejected active-region update");
        }

        decision
    }

    fn class(&self, region: Region) -> HealthClass {
        self.health
            .get(&region)
            .copied()
            .unwrap_or(HealthClass::Healthy)
    }
}
