//! HTTP implementation of [`GatewayControl`]
//!
//! Speaks to the gateway container's management endpoint (wg-easy style
//! REST surface): peers are installed and dropped under `/api/peers`, the
//! health endpoint doubles as the liveness probe, and the interface
//! endpoint reports the advertised MTU ceiling.

use crate::control::{GatewayControl, GatewayError, Liveness};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Connection settings for one regional gateway endpoint.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL of the management endpoint, e.g. `http://10.0.0.1:51821`
    pub base_url: String,
    /// Management password sent as a bearer token
    pub password: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// [`GatewayControl`] over the gateway's management REST endpoint.
pub struct HttpGateway {
    client: reqwest::Client,
    config: HttpGatewayConfig,
}

#[derive(Serialize)]
struct StartPeerBody<'a> {
    public_key: &'a str,
    allowed_ip: Ipv4Addr,
}

#[derive(Deserialize)]
struct InterfaceInfo {
    mtu: u16,
}

#[derive(Serialize)]
struct PathProbeBody {
    size: u16,
    /// Fragmentation-prohibited marker (DF bit on the probe packet)
    dont_fragment: bool,
}

#[derive(Deserialize)]
struct PathProbeReply {
    delivered: bool,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_err(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_status() {
            GatewayError::Rejected(err.to_string())
        } else {
            GatewayError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl GatewayControl for HttpGateway {
    async fn start_peer(&self, public_key: &str, allowed_ip: Ipv4Addr) -> Result<(), GatewayError> {
        self.client
            .post(self.url("/api/peers"))
            .bearer_auth(&self.config.password)
            .json(&StartPeerBody {
                public_key,
                allowed_ip,
            })
            .send()
            .await
            .map_err(Self::map_err)?
            .error_for_status()
            .map_err(Self::map_err)?;
        debug!(allowed_ip = %allowed_ip, "Installed peer on gateway");
        Ok(())
    }

    async fn drop_peer(&self, public_key: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/peers/{}", urlencode(public_key))))
            .bearer_auth(&self.config.password)
            .send()
            .await
            .map_err(Self::map_err)?;

        // 404 means the session was already gone; revocation stays idempotent
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Gateway had no session for dropped peer");
            return Ok(());
        }
        response.error_for_status().map_err(Self::map_err)?;
        Ok(())
    }

    async fn probe_liveness(&self) -> Result<Liveness, GatewayError> {
        let started = Instant::now();
        self.client
            .get(self.url("/api/health"))
            .bearer_auth(&self.config.password)
            .send()
            .await
            .map_err(Self::map_err)?
            .error_for_status()
            .map_err(Self::map_err)?;
        Ok(Liveness {
            latency: started.elapsed(),
        })
    }

    async fn mtu_ceiling(&self) -> Result<u16, GatewayError> {
        let info: InterfaceInfo = self
            .client
            .get(self.url("/api/interface"))
            .bearer_auth(&self.config.password)
            .send()
            .await
            .map_err(Self::map_err)?
            .error_for_status()
            .map_err(Self::map_err)?
            .json()
            .await
            .map_err(|e| GatewayError::BadResponse(e.to_string()))?;
        Ok(info.mtu)
    }

    async fn probe_path(&self, size: u16) -> Result<bool, GatewayError> {
        let reply: PathProbeReply = self
            .client
            .post(self.url("/api/probe"))
            .bearer_auth(&self.config.password)
            .json(&PathProbeBody {
                size,
                dont_fragment: true,
            })
            .send()
            .await
            .map_err(Self::map_err)?
            .error_for_status()
            .map_err(Self::map_err)?
            .json()
            .await
            .map_err(|e| GatewayError::BadResponse(e.to_string()))?;
        Ok(reply.delivered)
    }
}

/// Minimal percent-encoding for base64 key material in path segments
/// ('+', '/', '=' are the only characters outside the unreserved set).
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencode_base64_key() {
        assert_eq!(urlencode("abc123"), "abc123");
        assert_eq!(urlencode("a+b/c="), "a%2Bb%2Fc%3D");
    }

    #[test]
    fn test_url_join_trims_trailing_slash() {
        let gateway = HttpGateway::new(HttpGatewayConfig {
            base_url: "http://gw.west:51821/".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        assert_eq!(gateway.url("/api/health"), "http://gw.west:51821/api/health");
    }
}
