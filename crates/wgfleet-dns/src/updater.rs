//! Serialized, idempotent application of failover decisions
//!
//! One apply at a time per updater; a repeated idempotency key is a no-op,
//! so re-asserted decisions never burn provider rate limit. Transient
//! provider failures retry with capped exponential backoff; exhausting the
//! retries reports the failure without advancing the applied key, leaving
//! the prior record authoritative.

use crate::api::DnsApi;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use wgfleet_proto::{FailoverDecision, FleetError, Region};

/// Backoff policy for transient provider failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
        }
    }
}

struct UpdaterState {
    /// Idempotency key of the last successfully applied decision
    last_applied: Option<String>,
}

/// Applies failover decisions to the dynamic-DNS record.
pub struct DnsUpdater {
    api: Arc<dyn DnsApi>,
    hostname: String,
    ttl: u32,
    /// Public endpoint address per region
    endpoints: HashMap<Region, String>,
    retry: RetryPolicy,
    state: Mutex<UpdaterState>,
}

impl DnsUpdater {
    pub fn new(
        api: Arc<dyn DnsApi>,
        hostname: String,
        ttl: u32,
        endpoints: HashMap<Region, String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api,
            hostname,
            ttl,
            endpoints,
            retry,
            state: Mutex::new(UpdaterState { last_applied: None }),
        }
    }

    /// Apply `decision` to the DNS record.
    ///
    /// Holding the state lock across the provider call serializes applies;
    /// a timed-out or failed apply releases the lock without advancing the
    /// applied key, so the next apply retries from the prior known state.
    pub async fn apply(&self, decision: &FailoverDecision) -> Result<(), FleetError> {
        let mut state = self.state.lock().await;

        let key = decision.idempotency_key();
        if state.last_applied.as_deref() == Some(key.as_str()) {
            info!(key = %key, "Decision already applied, skipping DNS update");
            return Ok(());
        }

        let value = self.endpoints.get(&decision.active).ok_or_else(|| {
            FleetError::DnsApplyFailure(format!("no endpoint for region {}", decision.active))
        })?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.api.update_record(&self.hostname, value, self.ttl).await {
                Ok(()) => {
                    info!(
                        region = %decision.active,
                        value = %value,
                        attempt,
                        "DNS record now points at active region"
                    );
                    state.last_applied = Some(key);
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e,
                        "Transient DNS failure, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(region = %decision.active, attempts = attempt, error = %e,
                        "DNS apply failed; prior record remains authoritative");
                    return Err(FleetError::DnsApplyFailure(e.to_string()));
                }
            }
        }
    }
}
