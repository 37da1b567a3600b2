//! DNS provider contract

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the DNS provider.
///
/// The transient/permanent split drives the updater's retry policy:
/// transient failures (5xx, timeouts, connection resets) are retried with
/// backoff, permanent ones (auth failures, bad records) are not.
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("transient DNS API failure: {0}")]
    Transient(String),

    #[error("permanent DNS API failure: {0}")]
    Permanent(String),
}

impl DnsError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DnsError::Transient(_))
    }
}

/// Narrow update-record operation against a third-party DNS provider.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// Set `hostname`'s address record to `value` with the given TTL.
    /// The provider applies each call atomically.
    async fn update_record(&self, hostname: &str, value: &str, ttl: u32) -> Result<(), DnsError>;
}
