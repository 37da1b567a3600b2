//! Debounced health classification for one region

use chrono::{DateTime, Utc};
use wgfleet_proto::{HealthClass, Region, RegionHealth};

/// Outcome of a single probe, before debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Answered within the latency threshold
    Healthy,
    /// Answered, but slowly
    Degraded,
    /// Timed out or errored; ambiguity counts as failure
    Down,
}

impl ProbeOutcome {
    fn class(self) -> HealthClass {
        match self {
            ProbeOutcome::Healthy => HealthClass::Healthy,
            ProbeOutcome::Degraded => HealthClass::Degraded,
            ProbeOutcome::Down => HealthClass::Down,
        }
    }

    fn is_failure(self) -> bool {
        self == ProbeOutcome::Down
    }
}

/// Rolls probe outcomes into a debounced [`RegionHealth`].
///
/// The classification only flips after `debounce` consecutive probes agree
/// on a different class, which keeps a single dropped packet from flapping
/// the failover controller.
pub struct RegionHealthTracker {
    health: RegionHealth,
    debounce: u32,
    /// Class the recent streak is voting for, with its length
    candidate: Option<(HealthClass, u32)>,
}

impl RegionHealthTracker {
    pub fn new(region: Region, debounce: u32) -> Self {
        Self {
            health: RegionHealth::new(region),
            debounce: debounce.max(1),
            candidate: None,
        }
    }

    pub fn health(&self) -> &RegionHealth {
        &self.health
    }

    /// Record one probe outcome. Returns the new classification when the
    /// debounce threshold flips it, `None` otherwise.
    pub fn observe(&mut self, outcome: ProbeOutcome, at: DateTime<Utc>) -> Option<HealthClass> {
        self.health.last_probe_at = Some(at);
        if outcome.is_failure() {
            self.health.consecutive_failures += 1;
            self.health.consecutive_successes = 0;
        } else {
            self.health.consecutive_successes += 1;
            self.health.consecutive_failures = 0;
        }

        let target = outcome.class();
        if target == self.health.class {
            self.candidate = None;
            return None;
        }

        let streak = match self.candidate {
            Some((class, count)) if class == target => count + 1,
            _ => 1,
        };

        if streak >= self.debounce {
            self.health.class = target;
            self.candidate = None;
            Some(target)
        } else {
            self.candidate = Some((target, streak));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> RegionHealthTracker {
        RegionHealthTracker::new(Region::West, 3)
    }

    #[test]
    fn test_single_failure_does_not_flip() {
        let mut t = tracker();
        assert!(t.observe(ProbeOutcome::Down, Utc::now()).is_none());
        assert_eq!(t.health().class, HealthClass::Healthy);
        assert_eq!(t.health().consecutive_failures, 1);
    }

    #[test]
    fn test_debounce_threshold_flips_to_down() {
        let mut t = tracker();
        assert!(t.observe(ProbeOutcome::Down, Utc::now()).is_none());
        assert!(t.observe(ProbeOutcome::Down, Utc::now()).is_none());
        assert_eq!(
            t.observe(ProbeOutcome::Down, Utc::now()),
            Some(HealthClass::Down)
        );
        assert_eq!(t.health().class, HealthClass::Down);
        assert_eq!(t.health().consecutive_failures, 3);
    }

    #[test]
    fn test_interleaved_success_resets_streak() {
        let mut t = tracker();
        t.observe(ProbeOutcome::Down, Utc::now());
        t.observe(ProbeOutcome::Down, Utc::now());
        t.observe(ProbeOutcome::Healthy, Utc::now());
        // Streak broken; two more failures are still not enough
        t.observe(ProbeOutcome::Down, Utc::now());
        assert!(t.observe(ProbeOutcome::Down, Utc::now()).is_none());
        assert_eq!(t.health().class, HealthClass::Healthy);
    }

    #[test]
    fn test_recovery_is_also_debounced() {
        let mut t = tracker();
        for _ in 0..3 {
            t.observe(ProbeOutcome::Down, Utc::now());
        }
        assert_eq!(t.health().class, HealthClass::Down);

        t.observe(ProbeOutcome::Healthy, Utc::now());
        t.observe(ProbeOutcome::Healthy, Utc::now());
        assert_eq!(t.health().class, HealthClass::Down);
        assert_eq!(
            t.observe(ProbeOutcome::Healthy, Utc::now()),
            Some(HealthClass::Healthy)
        );
    }

    #[test]
    fn test_degraded_classification() {
        let mut t = tracker();
        for _ in 0..2 {
            assert!(t.observe(ProbeOutcome::Degraded, Utc::now()).is_none());
        }
        assert_eq!(
            t.observe(ProbeOutcome::Degraded, Utc::now()),
            Some(HealthClass::Degraded)
        );
        // Degraded probes still count as reachability successes
        assert_eq!(t.health().consecutive_successes, 3);
    }

    #[test]
    fn test_candidate_switch_restarts_streak() {
        let mut t = tracker();
        t.observe(ProbeOutcome::Down, Utc::now());
        t.observe(ProbeOutcome::Down, Utc::now());
        t.observe(ProbeOutcome::Degraded, Utc::now());
        t.observe(ProbeOutcome::Degraded, Utc::now());
        // Neither candidate reached three in a row
        assert_eq!(t.health().class, HealthClass::Healthy);
    }
}
