//! Configuration for the discovery engine.

use std::net::IpAddr;
use std::time::Duration;

/// Look-ahead applied when draining the outbound queues, so records due
/// within the window share one packet.
pub(crate) const MESSAGE_AGGREGATION_WINDOW: Duration = Duration::from_millis(100);

/// TTL for host address (A/AAAA) records (RFC 6762 section 10).
pub(crate) const ADDRESS_TTL: u32 = 120;

/// TTL for PTR/SRV/TXT records (RFC 6762 section 10).
pub(crate) const RESOURCE_TTL: u32 = 4500;

/// Sentinel TTL marking a queued record as cancelled. Message assembly skips
/// records carrying it.
pub(crate) const CANCELLED_TTL: u32 = u32::MAX;

/// Delay between the repeated announcements of a published instance.
pub(crate) const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(1);

/// Number of times a published instance announces itself on startup.
pub(crate) const ANNOUNCE_COUNT: u32 = 2;

/// First re-query interval of a service subscription; doubles per query.
pub(crate) const QUERY_INITIAL_INTERVAL: Duration = Duration::from_secs(1);

/// Cap for the subscription re-query interval.
pub(crate) const QUERY_MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Address family of a network interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

/// Configuration for the discovery engine.
///
/// Use the builder pattern to construct a configuration:
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr};
///
/// use mdns::MdnsConfig;
///
/// let config = MdnsConfig::new()
///     .with_local_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42)))
///     .with_verbose(true);
/// ```
#[derive(Default, Clone, Debug)]
pub struct MdnsConfig {
    /// Local addresses advertised for the host.
    ///
    /// The engine substitutes these into the shared address placeholder when
    /// it assembles an outbound message: one A record per IPv4 address and
    /// one AAAA record per IPv6 address.
    pub local_ips: Vec<IpAddr>,

    /// When set, every inbound and outbound message is logged in full.
    pub verbose: bool,
}

impl MdnsConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a local address to advertise in address records.
    pub fn with_local_ip(mut self, ip: IpAddr) -> Self {
        self.local_ips.push(ip);
        self
    }

    /// Enable or disable verbose message logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
