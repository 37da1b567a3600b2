//! Cloudflare implementation of the DNS record update

use crate::api::{DnsApi, DnsError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare zone credentials and record coordinates.
#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    /// API token with DNS edit permission on the zone
    pub api_token: String,
    pub zone_id: String,
    /// Record id of the A record being flipped between regions
    pub record_id: String,
    /// Override for tests; defaults to the public API base
    pub api_base: Option<String>,
    pub timeout: Duration,
}

pub struct CloudflareDns {
    client: reqwest::Client,
    config: CloudflareConfig,
}

#[derive(Serialize)]
struct UpdateRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
}

#[derive(Deserialize)]
struct ApiReply {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl CloudflareDns {
    pub fn new(config: CloudflareConfig) -> Result<Self, DnsError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DnsError::Permanent(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn record_url(&self) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            self.config
                .api_base
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/'),
            self.config.zone_id,
            self.config.record_id
        )
    }
}

#[async_trait]
impl DnsApi for CloudflareDns {
    async fn update_record(&self, hostname: &str, value: &str, ttl: u32) -> Result<(), DnsError> {
        let response = self
            .client
            .put(self.record_url())
            .bearer_auth(&self.config.api_token)
            .json(&UpdateRecordBody {
                record_type: "A",
                name: hostname,
                content: value,
                ttl,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    DnsError::Transient(e.to_string())
                } else {
                    DnsError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DnsError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(DnsError::Permanent(format!("HTTP {}", status)));
        }

        let reply: ApiReply = response
            .json()
            .await
            .map_err(|e| DnsError::Transient(e.to_string()))?;
        if !reply.success {
            let detail = reply
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown API error".to_string());
            return Err(DnsError::Permanent(detail));
        }

        debug!(hostname = %hostname, value = %value, ttl, "DNS record updated");
        Ok(())
    }
}
