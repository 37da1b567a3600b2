//! Error taxonomy for operator-facing and internal operations

use thiserror::Error;

/// Errors surfaced by the wgfleet control plane.
///
/// `ProbeTimeout` and transient `DnsApplyFailure`s are absorbed internally
/// (converted into health counters and retries); the remaining variants
/// reach the operator-facing layer without internal retry.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("peer not found: {0}")]
    NotFound(String),

    #[error("peer already revoked: {0}")]
    AlreadyRevoked(String),

    #[error("address pool exhausted for region {0}")]
    PoolExhausted(String),

    #[error("key generation failed: {0}")]
    CryptoFailure(String),

    #[error("probe timed out for region {0}")]
    ProbeTimeout(String),

    #[error("DNS apply failed: {0}")]
    DnsApplyFailure(String),

    /// Fatal for the mutating path: the registry refuses writes until an
    /// operator intervenes, since IP uniqueness can no longer be guaranteed.
    /// Health probing and failover keep running.
    #[error("registry corrupted: {0}")]
    RegistryCorruption(String),

    #[error("gateway control error: {0}")]
    Gateway(String),

    #[error("failover refused: {0}")]
    FailoverRefused(String),

    #[error("persistence error: {0}")]
    Persist(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FleetError {
    /// Process exit code for the operator-facing CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            FleetError::NotFound(_) => 2,
            FleetError::AlreadyRevoked(_) => 3,
            FleetError::PoolExhausted(_) => 4,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let not_found = FleetError::NotFound("p1".into());
        let revoked = FleetError::AlreadyRevoked("p1".into());
        let exhausted = FleetError::PoolExhausted("west".into());
        let generic = FleetError::CryptoFailure("rng".into());

        assert_eq!(not_found.exit_code(), 2);
        assert_eq!(revoked.exit_code(), 3);
        assert_eq!(exhausted.exit_code(), 4);
        assert_eq!(generic.exit_code(), 1);
    }

    #[test]
    fn test_display_includes_subject() {
        let err = FleetError::NotFound("abc123".into());
        assert!(err.to_string().contains("abc123"));
    }
}
