//! Peer credential records and region identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// A deployed regional gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    West,
    East,
}

impl Region {
    /// The other region in the two-region deployment.
    pub fn other(self) -> Region {
        match self {
            Region::West => Region::East,
            Region::East => Region::West,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::West => "west",
            Region::East => "east",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "west" => Ok(Region::West),
            "east" => Ok(Region::East),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

/// Which gateway a peer's exported config should point at.
///
/// `Both` peers follow the failover controller's current active region;
/// `West`/`East` pin the peer to one gateway regardless of failover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionAffinity {
    West,
    East,
    Both,
}

impl RegionAffinity {
    /// Resolve the affinity against the currently active region.
    pub fn resolve(self, active: Region) -> Region {
        match self {
            RegionAffinity::West => Region::West,
            RegionAffinity::East => Region::East,
            RegionAffinity::Both => active,
        }
    }
}

impl From<Region> for RegionAffinity {
    fn from(region: Region) -> Self {
        match region {
            Region::West => RegionAffinity::West,
            Region::East => RegionAffinity::East,
        }
    }
}

impl fmt::Display for RegionAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionAffinity::West => f.write_str("west"),
            RegionAffinity::East => f.write_str("east"),
            RegionAffinity::Both => f.write_str("both"),
        }
    }
}

impl FromStr for RegionAffinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "west" => Ok(RegionAffinity::West),
            "east" => Ok(RegionAffinity::East),
            "both" => Ok(RegionAffinity::Both),
            other => Err(format!("unknown region affinity: {}", other)),
        }
    }
}

/// Lifecycle state of a peer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerState {
    Active,
    Revoked,
}

/// A registered VPN peer credential.
///
/// The private key is generated once at creation and retained so the peer's
/// client configuration can be exported later; it is never re-derivable.
/// The allowed-IP is unique for the lifetime of the registry, including
/// after revocation, so stale client configs can never collide with a
/// newer peer's route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    /// Stable unique identifier (UUID v4)
    pub id: String,
    /// Base64-encoded X25519 public key
    pub public_key: String,
    /// Base64-encoded X25519 private key, retained for export
    pub private_key: String,
    /// Virtual address assigned inside the tunnel network
    pub allowed_ip: Ipv4Addr,
    /// Timestamp when this peer was created
    pub created_at: DateTime<Utc>,
    pub state: PeerState,
    /// Gateway affinity for exported configs
    pub region: RegionAffinity,
    /// Last tuned path MTU, if a tuning run has converged for this peer
    pub mtu: Option<u16>,
}

impl PeerRecord {
    pub fn is_active(&self) -> bool {
        self.state == PeerState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_other() {
        assert_eq!(Region::West.other(), Region::East);
        assert_eq!(Region::East.other(), Region::West);
    }

    #[test]
    fn test_region_parse_roundtrip() {
        assert_eq!("west".parse::<Region>().unwrap(), Region::West);
        assert_eq!("EAST".parse::<Region>().unwrap(), Region::East);
        assert!("north".parse::<Region>().is_err());
        assert_eq!(Region::West.to_string(), "west");
    }

    #[test]
    fn test_affinity_resolution() {
        assert_eq!(RegionAffinity::West.resolve(Region::East), Region::West);
        assert_eq!(RegionAffinity::East.resolve(Region::West), Region::East);
        assert_eq!(RegionAffinity::Both.resolve(Region::East), Region::East);
        assert_eq!(RegionAffinity::Both.resolve(Region::West), Region::West);
    }

    #[test]
    fn test_peer_record_serde() {
        let record = PeerRecord {
            id: "b5d1c0de-0000-4000-8000-000000000001".to_string(),
            public_key: "pub".to_string(),
            private_key: "priv".to_string(),
            allowed_ip: Ipv4Addr::new(10, 66, 0, 2),
            created_at: Utc::now(),
            state: PeerState::Active,
            region: RegionAffinity::Both,
            mtu: Some(1380),
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: PeerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.allowed_ip, record.allowed_ip);
        assert_eq!(back.state, PeerState::Active);
        assert_eq!(back.region, RegionAffinity::Both);
        assert_eq!(back.mtu, Some(1380));
    }
}
