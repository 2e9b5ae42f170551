//! Devices discovered on the local network.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

/// What a scanner records about an announcing peer: where to connect and the
/// display name the peer advertised.
///
/// Identity is `(address, port)` only. Two announcements from the same
/// address and transfer port describe the same device even when the
/// advertised names differ; the first-seen name wins. This cannot tell apart
/// two devices sharing a NAT or proxy address on the same port, which is an
/// accepted limitation of LAN-local discovery.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Source address the announcement arrived from.
    pub address: IpAddr,
    /// Display name the peer advertised.
    pub name: String,
    /// TCP port the peer's transfer listener is bound to.
    pub port: u16,
}

impl DeviceDescriptor {
    /// The socket address of the peer's transfer listener.
    pub fn transfer_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl PartialEq for DeviceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.port == other.port
    }
}

impl Eq for DeviceDescriptor {}

impl Hash for DeviceDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.address, self.port)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
