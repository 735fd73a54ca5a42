//! # mdns
//!
//! A sans-I/O mDNS (Multicast DNS, RFC 6762) service-discovery engine.
//!
//! One [`Mdns`] engine answers address queries for the local host, announces
//! and defends locally published service instances, resolves remote
//! `.local` host names, and keeps live subscriptions to service types on
//! the link, multiplexing any number of those activities over one multicast
//! transport.
//!
//! ## Sans-I/O design
//!
//! The engine performs no I/O and spawns no tasks; it is a state machine
//! implementing [`sansio::Protocol`]. The caller is responsible for:
//!
//! 1. Reading packets from the mDNS multicast group and calling
//!    [`handle_read()`](sansio::Protocol::handle_read)
//! 2. Sending packets returned by [`poll_write()`](sansio::Protocol::poll_write)
//! 3. Calling [`handle_timeout()`](sansio::Protocol::handle_timeout) when
//!    [`poll_timeout()`](sansio::Protocol::poll_timeout) expires
//! 4. Processing discovery results from
//!    [`poll_event()`](sansio::Protocol::poll_event)
//!
//! ## Quick start
//!
//! ```rust
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::time::{Duration, Instant};
//!
//! use mdns::{Mdns, MdnsConfig, MdnsEvent};
//! use sansio::Protocol;
//!
//! let config = MdnsConfig::new().with_local_ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
//! let mut engine = Mdns::new(config);
//! engine.start("alpha").unwrap();
//!
//! // Publish a printer on port 9100.
//! engine
//!     .publish_service_instance("_printer._tcp", "lp1", 9100, vec!["paper=A4".into()])
//!     .unwrap();
//!
//! // Resolve a remote host, giving it two seconds.
//! engine
//!     .resolve_host_name("beta", Instant::now() + Duration::from_secs(2))
//!     .unwrap();
//!
//! // The announcement and the queries go out in packets surfaced here.
//! while let Some(packet) = engine.poll_write() {
//!     // socket.send_to(&packet.message, packet.transport.peer_addr)
//!     assert_eq!(packet.transport.peer_addr.to_string(), "224.0.0.251:5353");
//! }
//! ```
//!
//! ## Drive loop
//!
//! ```text
//! loop {
//!     while let Some(packet) = engine.poll_write() {
//!         socket.send_to(&packet.message, packet.transport.peer_addr);
//!     }
//!     select! {
//!         packet = socket.recv_from() => engine.handle_read(packet),
//!         _ = sleep_until(engine.poll_timeout()) => engine.handle_timeout(Instant::now()),
//!     }
//!     while let Some(event) = engine.poll_event() {
//!         // MdnsEvent::HostNameResolved / MdnsEvent::ServiceInstance
//!     }
//! }
//! ```
//!
//! See the `publish`, `discover` and `resolve` examples for complete tokio
//! drive loops built on [`MulticastSocket`].

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub(crate) mod config;
pub(crate) mod engine;
pub(crate) mod message;
pub mod names;
pub(crate) mod socket;

pub use config::{AddressFamily, MdnsConfig};
pub use engine::{
    InstanceChange, MDNS_DEST_ADDR, MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT, Mdns,
    MdnsEvent, ServiceInstance,
};
pub use socket::MulticastSocket;
