//! Dynamic DNS record management
//!
//! A narrow seam over the third-party DNS provider: one update-record
//! operation, plus the serialized updater that applies failover decisions
//! idempotently with bounded retries.

pub mod api;
pub mod cloudflare;
pub mod updater;

pub use api::{DnsApi, DnsError};
pub use cloudflare::{CloudflareConfig, CloudflareDns};
pub use updater::{DnsUpdater, RetryPolicy};
