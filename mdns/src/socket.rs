//! Socket utilities for drivers.
//!
//! The engine itself performs no I/O; [`MulticastSocket`] builds the
//! properly configured UDP sockets a drive loop needs.
//!
//! # Example
//!
//! ```rust,ignore
//! use mdns::MulticastSocket;
//!
//! let std_socket = MulticastSocket::new().into_std()?;
//!
//! // For tokio:
//! let socket = tokio::net::UdpSocket::from_std(std_socket)?;
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::engine::{MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT};

/// A builder for multicast UDP sockets suitable for mDNS.
///
/// The resulting socket is:
///
/// - Bound to the mDNS port (or an override)
/// - Configured with `SO_REUSEADDR` (and `SO_REUSEPORT` where supported)
/// - Set to non-blocking mode for async compatibility
/// - Joined to the mDNS multicast group: `224.0.0.251` via [`into_std`],
///   `ff02::fb` via [`into_std_v6`]
///
/// [`into_std`]: MulticastSocket::into_std
/// [`into_std_v6`]: MulticastSocket::into_std_v6
#[derive(Debug, Clone, Default)]
pub struct MulticastSocket {
    local_ipv4: Option<Ipv4Addr>,
    local_port: Option<u16>,
    interface: Option<Ipv4Addr>,
    interface_index_v6: Option<u32>,
}

impl MulticastSocket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the local IPv4 address to bind.
    pub fn with_local_ipv4(mut self, local_ipv4: Ipv4Addr) -> Self {
        self.local_ipv4 = Some(local_ipv4);
        self
    }

    /// Overrides the local port (default: 5353).
    pub fn with_local_port(mut self, local_port: u16) -> Self {
        self.local_port = Some(local_port);
        self
    }

    /// Joins the IPv4 group on a specific interface instead of `INADDR_ANY`.
    pub fn with_interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Joins the IPv6 group on a specific interface index instead of 0.
    pub fn with_interface_index_v6(mut self, index: u32) -> Self {
        self.interface_index_v6 = Some(index);
        self
    }

    /// Builds the IPv4 socket, joined to `224.0.0.251`.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        // Allow other mDNS responders on the same host.
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;

        let local_ip = if let Some(local_ipv4) = self.local_ipv4 {
            IpAddr::V4(local_ipv4)
        } else if cfg!(target_os = "linux") {
            IpAddr::V4(MDNS_MULTICAST_IPV4)
        } else {
            // Binding the group address doesn't work on Mac/Win; only
            // 0.0.0.0 does.
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        let local_addr = SocketAddr::new(local_ip, self.local_port.unwrap_or(MDNS_PORT));
        socket.bind(&local_addr.into())?;

        let iface = self.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &iface)?;

        Ok(socket.into())
    }

    /// Builds the IPv6 socket, joined to `ff02::fb`.
    pub fn into_std_v6(self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;

        socket.set_only_v6(true)?;
        socket.set_nonblocking(true)?;

        let local_addr = SocketAddr::new(
            IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            self.local_port.unwrap_or(MDNS_PORT),
        );
        socket.bind(&local_addr.into())?;

        let index = self.interface_index_v6.unwrap_or(0);
        socket.join_multicast_v6(&MDNS_MULTICAST_IPV6, index)?;

        Ok(socket.into())
    }
}
