//! Region address pools for allowed-IP allocation

use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// The tunnel-network address pool of one region.
///
/// Allocation is a sequential scan that skips the network address, the
/// gateway address (first host), the broadcast address, and anything
/// already assigned. Assigned addresses are never returned to the pool,
/// even after revocation.
#[derive(Debug, Clone)]
pub struct AddressPool {
    network: Ipv4Network,
}

impl AddressPool {
    pub fn new(network: Ipv4Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Ipv4Network {
        self.network
    }

    /// The gateway's own tunnel address (first host in the network).
    pub fn gateway_address(&self) -> Ipv4Addr {
        let base = u32::from(self.network.network());
        Ipv4Addr::from(base + 1)
    }

    /// Whether an address belongs to this pool's network.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.network.contains(addr)
    }

    /// Next free address, or `None` when the pool is exhausted.
    pub fn allocate(&self, assigned: &HashSet<Ipv4Addr>) -> Option<Ipv4Addr> {
        let reserved = [
            self.network.network(),
            self.gateway_address(),
            self.network.broadcast(),
        ];
        self.network
            .iter()
            .find(|addr| !reserved.contains(addr) && !assigned.contains(addr))
    }
}
