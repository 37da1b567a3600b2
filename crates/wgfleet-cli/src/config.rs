//! Fleet configuration management
//!
//! Stores the fleet layout (regions, pools, DNS coordinates) in
//! ~/.wgfleet/config.json. Secrets (gateway password, DNS API token) come
//! from the environment or CLI flags, never from the file.

use anyhow::{Context, Result};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Per-region gateway coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Public IPv4 the DNS record points at when this region is active
    pub endpoint: String,
    /// Management endpoint base URL, e.g. "http://10.0.1.5:51821"
    pub gateway_url: String,
    /// The gateway's WireGuard public key, baked into exported configs
    pub gateway_public_key: String,
    /// Tunnel-network pool for peers hinted to this region
    pub pool: Ipv4Network,
}

/// DNS provider coordinates (Cloudflare zone/record ids).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsProviderConfig {
    pub zone_id: String,
    pub record_id: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

fn default_ttl() -> u32 {
    60
}

/// Probe scheduling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_degraded_latency_ms")]
    pub degraded_latency_ms: u64,
    #[serde(default = "default_debounce")]
    pub debounce: u32,
}

fn default_interval_secs() -> u64 {
    10
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_degraded_latency_ms() -> u64 {
    750
}
fn default_debounce() -> u32 {
    3
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
            degraded_latency_ms: default_degraded_latency_ms(),
            debounce: default_debounce(),
        }
    }
}

/// Fleet configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Dynamic-DNS hostname clients connect through
    pub hostname: String,
    /// Gateway WireGuard listen port
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// DNS server pushed to clients, if any
    #[serde(default)]
    pub client_dns: Option<String>,
    #[serde(default = "default_keepalive")]
    pub keepalive: u16,
    pub west: RegionConfig,
    pub east: RegionConfig,
    pub dns: DnsProviderConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

fn default_listen_port() -> u16 {
    51820
}
fn default_keepalive() -> u16 {
    25
}

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Base state directory (~/.wgfleet), also holding the registry
    /// snapshot and failover history.
    pub fn state_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".wgfleet"))
    }

    fn default_config_path() -> Result<PathBuf> {
        Ok(Self::state_dir()?.join("config.json"))
    }

    /// Load the configuration, from `path` if given, else the default.
    pub fn load(path: Option<PathBuf>) -> Result<FleetConfig> {
        let path = match path {
            Some(p) => p,
            None => Self::default_config_path()?,
        };

        let json = fs::read_to_string(&path)
            .context(format!("Failed to read config file: {:?}", path))?;
        let config: FleetConfig = serde_json::from_str(&json)
            .context(format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Save the configuration to its default location.
    pub fn save(config: &FleetConfig) -> Result<PathBuf> {
        let path = Self::default_config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(&path, json).context(format!("Failed to write config file: {:?}", path))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> FleetConfig {
        FleetConfig {
            hostname: "vpn.example.net".to_string(),
            listen_port: 51820,
            client_dns: Some("1.1.1.1".to_string()),
            keepalive: 25,
            west: RegionConfig {
                endpoint: "198.51.100.10".to_string(),
                gateway_url: "http://10.0.1.5:51821".to_string(),
                gateway_public_key: "WESTKEY".to_string(),
                pool: "10.8.0.0/24".parse().unwrap(),
            },
            east: RegionConfig {
                endpoint: "203.0.113.20".to_string(),
                gateway_url: "http://10.0.2.5:51821".to_string(),
                gateway_public_key: "EASTKEY".to_string(),
                pool: "10.9.0.0/24".parse().unwrap(),
            },
            dns: DnsProviderConfig {
                zone_id: "zone".to_string(),
                record_id: "record".to_string(),
                ttl: 60,
            },
            probe: ProbeConfig::default(),
        }
    }

    #[test]
    fn test_config_roundtrip_via_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            serde_json::to_string_pretty(&sample_config()).unwrap(),
        )
        .unwrap();

        let loaded = ConfigManager::load(Some(path)).unwrap();
        assert_eq!(loaded.hostname, "vpn.example.net");
        assert_eq!(loaded.west.pool.to_string(), "10.8.0.0/24");
        assert_eq!(loaded.probe.debounce, 3);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        // Minimal config: probe block and ports omitted entirely
        let json = r#"{
            "hostname": "vpn.example.net",
            "west": {"endpoint": "198.51.100.10", "gateway_url": "http://w:51821",
                     "gateway_public_key": "WK", "pool": "10.8.0.0/24"},
            "east": {"endpoint": "203.0.113.20", "gateway_url": "http://e:51821",
                     "gateway_public_key": "EK", "pool": "10.9.0.0/24"},
            "dns": {"zone_id": "z", "record_id": "r"}
        }"#;
        fs::write(&path, json).unwrap();

        let loaded = ConfigManager::load(Some(path)).unwrap();
        assert_eq!(loaded.listen_port, 51820);
        assert_eq!(loaded.keepalive, 25);
        assert_eq!(loaded.dns.ttl, 60);
        assert_eq!(loaded.probe.interval_secs, 10);
        assert!(loaded.client_dns.is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigManager::load(Some(dir.path().join("nope.json"))).is_err());
    }
}
