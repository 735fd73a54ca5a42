//! The agent/scheduler core: one registry of named protocol agents
//! multiplexed over three time-ordered queues, a 100 ms outbound aggregation
//! window, and a single armed timer.
//!
//! The engine performs no I/O. The caller reads packets from the multicast
//! group and feeds them to [`handle_read`](sansio::Protocol::handle_read),
//! sends whatever [`poll_write`](sansio::Protocol::poll_write) surfaces,
//! calls [`handle_timeout`](sansio::Protocol::handle_timeout) when the
//! deadline from [`poll_timeout`](sansio::Protocol::poll_timeout) passes,
//! and consumes discovery results from
//! [`poll_event`](sansio::Protocol::poll_event). Every agent callback runs
//! inside those calls, on the caller's single drive loop.

pub(crate) mod agent;
mod address_responder;
mod host_name_resolver;
mod instance_publisher;
mod instance_subscriber;
mod resource_renewer;

#[cfg(test)]
mod engine_test;

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::rc::Rc;
use std::time::Instant;

use bytes::BytesMut;
use shared::error::{Error, Result};
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};

use crate::config::{
    ADDRESS_TTL, AddressFamily, CANCELLED_TTL, MESSAGE_AGGREGATION_WINDOW, MdnsConfig,
};
use crate::message::name::Name;
use crate::message::resource::{RData, Resource};
use crate::message::{CLASS_INET, Message};
use crate::names;

use agent::{Agent, EngineCore, ResourceSection, SharedResource};
use address_responder::AddressResponder;
use host_name_resolver::HostNameResolver;
use instance_publisher::InstancePublisher;
use instance_subscriber::InstanceSubscriber;
use resource_renewer::ResourceRenewer;

/// The mDNS multicast group address (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The mDNS multicast group address for IPv6 (ff02::fb).
pub const MDNS_MULTICAST_IPV6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// The standard mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;

/// mDNS multicast destination address (224.0.0.251:5353).
///
/// Outbound packets carry this destination; a driver sending on an IPv6
/// interface substitutes [`MDNS_MULTICAST_IPV6`].
pub const MDNS_DEST_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

/// What happened to a service instance a subscription watches.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InstanceChange {
    /// The instance is newly complete (SRV plus at least one address).
    Discovered,
    /// A field of a previously reported instance changed.
    Changed,
    /// The instance disappeared (goodbye or record expiration).
    Lost,
}

/// A snapshot of one service instance as a subscription knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    /// Service type, e.g. `"_printer._tcp"`.
    pub service: String,
    /// Instance label, e.g. `"lp1"`.
    pub instance: String,
    /// Best known address, IPv4 preferred.
    pub address: Option<IpAddr>,
    /// Port from the SRV record; 0 until one arrived.
    pub port: u16,
    /// TXT entries as strings.
    pub text: Vec<String>,
}

/// Events emitted by the engine.
///
/// Poll for events using [`poll_event()`](sansio::Protocol::poll_event) after
/// calling [`handle_read()`](sansio::Protocol::handle_read) or
/// [`handle_timeout()`](sansio::Protocol::handle_timeout).
#[derive(Debug, Clone, PartialEq)]
pub enum MdnsEvent {
    /// A host-name resolution finished. Emitted exactly once per
    /// [`Mdns::resolve_host_name`] call: with the first address found, or
    /// with `None` when the deadline passed unanswered.
    HostNameResolved {
        host_name: String,
        address: Option<IpAddr>,
    },

    /// A watched service instance was discovered, changed, or lost.
    ServiceInstance {
        change: InstanceChange,
        instance: ServiceInstance,
    },
}

/// Sans-I/O mDNS service-discovery engine.
///
/// One engine answers address queries for the local host, publishes local
/// service instances, resolves remote host names, and maintains service
/// subscriptions, all over a single multicast transport the caller drives.
///
/// # Example
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr};
///
/// use mdns::{Mdns, MdnsConfig};
/// use sansio::Protocol;
///
/// let config = MdnsConfig::new().with_local_ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
/// let mut engine = Mdns::new(config);
/// engine.start("alpha").unwrap();
///
/// engine.subscribe_to_service("_printer._tcp").unwrap();
///
/// // The PTR question goes out within the aggregation window.
/// let packet = engine.poll_write().expect("query packet");
/// assert_eq!(packet.transport.peer_addr.to_string(), "224.0.0.251:5353");
/// ```
pub struct Mdns {
    config: MdnsConfig,
    verbose: bool,
    started: bool,
    closed: bool,

    /// Interfaces selected via [`enable_interface`](Mdns::enable_interface),
    /// for the driver to consult when it builds its sockets.
    interfaces: Vec<(String, AddressFamily)>,

    /// Agent registry; iteration order is the stable key order.
    agents: BTreeMap<String, Box<dyn Agent>>,

    /// Always present and always dispatched first for resources.
    renewer: ResourceRenewer,

    core: EngineCore,

    /// Timestamps a timer has been armed for; the head backs `poll_timeout`.
    post_task_queue: BinaryHeap<Reverse<Instant>>,

    /// Assembled outbound packets.
    write_outs: VecDeque<TaggedBytesMut>,
}

impl Mdns {
    pub fn new(config: MdnsConfig) -> Self {
        let verbose = config.verbose;
        Mdns {
            config,
            verbose,
            started: false,
            closed: false,
            interfaces: Vec::new(),
            agents: BTreeMap::new(),
            renewer: ResourceRenewer::default(),
            core: EngineCore::new(),
            post_task_queue: BinaryHeap::new(),
            write_outs: VecDeque::new(),
        }
    }

    /// Selects an interface for the driver's sockets.
    pub fn enable_interface(&mut self, name: &str, family: AddressFamily) {
        self.interfaces.push((name.to_owned(), family));
    }

    /// The interfaces selected so far.
    pub fn enabled_interfaces(&self) -> &[(String, AddressFamily)] {
        &self.interfaces
    }

    /// Toggles full logging of inbound and outbound messages.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Starts the engine as `host_name` (answering for `<host_name>.local.`):
    /// installs the address responder and the resource renewer and begins
    /// driving registered agents.
    pub fn start(&mut self, host_name: &str) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        if self.started {
            log::warn!("engine already started");
            return Ok(());
        }

        let host_full_name = names::local_host_full_name(host_name)?;
        let now = Instant::now();

        self.core.host_full_name = host_full_name.clone();

        // The shared placeholder; assembly substitutes the configured
        // per-interface address records for it.
        self.core.address_placeholder = Some(Rc::new(RefCell::new(Resource {
            name: Name::new(&host_full_name)?,
            class: CLASS_INET,
            cache_flush: true,
            ttl: ADDRESS_TTL,
            rdata: RData::A(Ipv4Addr::UNSPECIFIED),
        })));

        self.agents.insert(
            AddressResponder::NAME.to_owned(),
            Box::new(AddressResponder::new(host_full_name)),
        );
        self.renewer = ResourceRenewer::default();

        self.started = true;

        for agent in self.agents.values_mut() {
            agent.start(&mut self.core, now);
        }
        self.drain_deferred(now);
        self.send_message(now);
        self.post_task();

        Ok(())
    }

    /// Stops driving the transport. Queued entries remain but nothing is
    /// sent; `start` may be called again.
    pub fn stop(&mut self) {
        self.started = false;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Looks up `<host_name>.local.` until `deadline`; the outcome arrives as
    /// [`MdnsEvent::HostNameResolved`].
    pub fn resolve_host_name(&mut self, host_name: &str, deadline: Instant) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        let host_full_name = names::local_host_full_name(host_name)?;
        let resolver =
            HostNameResolver::new(host_name.to_owned(), host_full_name.clone(), deadline);
        self.add_agent(host_full_name, Box::new(resolver));
        Ok(())
    }

    /// Watches instances of a service type; results arrive as
    /// [`MdnsEvent::ServiceInstance`] events until unsubscribed.
    pub fn subscribe_to_service(&mut self, service_name: &str) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        let service_full_name = names::local_service_full_name(service_name)?;
        let subscriber =
            InstanceSubscriber::new(service_name.to_owned(), service_full_name.clone())?;
        self.add_agent(service_full_name, Box::new(subscriber));
        Ok(())
    }

    /// Ends a service subscription.
    pub fn unsubscribe_to_service(&mut self, service_name: &str) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        let service_full_name = names::local_service_full_name(service_name)?;
        self.tell_agent_to_quit(&service_full_name);
        Ok(())
    }

    /// Announces `instance_name` as an instance of `service_name` on `port`
    /// and defends it until unpublished.
    pub fn publish_service_instance(
        &mut self,
        service_name: &str,
        instance_name: &str,
        port: u16,
        text: Vec<String>,
    ) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        if !self.started {
            // The SRV target is the local host name, which start() sets.
            return Err(Error::ErrEngineNotStarted);
        }
        let instance_full_name = names::local_instance_full_name(instance_name, service_name)?;
        let service_full_name = names::local_service_full_name(service_name)?;
        let publisher = InstancePublisher::new(
            &self.core.host_full_name,
            instance_full_name.clone(),
            service_full_name,
            port,
            text,
        )?;
        self.add_agent(instance_full_name, Box::new(publisher));
        Ok(())
    }

    /// Retracts a published instance with a goodbye announcement.
    pub fn unpublish_service_instance(
        &mut self,
        service_name: &str,
        instance_name: &str,
    ) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        let instance_full_name = names::local_instance_full_name(instance_name, service_name)?;
        self.tell_agent_to_quit(&instance_full_name);
        Ok(())
    }

    fn add_agent(&mut self, name: String, agent: Box<dyn Agent>) {
        if self.agents.insert(name.clone(), agent).is_some() {
            log::warn!("agent {name} replaced an existing registration");
        }

        if self.started {
            let now = Instant::now();
            if let Some(agent) = self.agents.get_mut(&name) {
                agent.start(&mut self.core, now);
            }
            self.drain_deferred(now);
            self.send_message(now);
            self.post_task();
        }
    }

    fn tell_agent_to_quit(&mut self, name: &str) {
        let now = Instant::now();
        if let Some(agent) = self.agents.get_mut(name) {
            agent.quit(&mut self.core, now);
            self.drain_deferred(now);
            self.send_message(now);
            self.post_task();
        } else {
            log::warn!("no agent named {name} to quit");
        }
    }

    // Applies everything agents requested during a dispatch round: renewals
    // go to the renewer, expirations fan out to every agent, removals leave
    // the registry. Fan-out may trigger more requests, so loop until quiet.
    fn drain_deferred(&mut self, now: Instant) {
        loop {
            if self.core.renewals.is_empty()
                && self.core.expirations.is_empty()
                && self.core.removals.is_empty()
            {
                return;
            }

            let renewals: Vec<Resource> = self.core.renewals.drain(..).collect();
            for resource in &renewals {
                self.renewer.renew(resource, &mut self.core, now);
            }

            let expirations: Vec<Resource> = self.core.expirations.drain(..).collect();
            for resource in &expirations {
                for agent in self.agents.values_mut() {
                    agent.receive_resource(resource, ResourceSection::Expired, &mut self.core, now);
                }
            }

            let removals: Vec<String> = self.core.removals.drain(..).collect();
            for name in &removals {
                if self.agents.remove(name).is_none() {
                    log::trace!("removal of unknown agent {name}");
                }
            }
        }
    }

    // Builds at most one outbound message from everything due within the
    // aggregation window.
    //
    // Sending records a bit early provides two advantages: more records per
    // message, and agents can schedule records in short sequences when the
    // sequence matters.
    fn send_message(&mut self, now: Instant) {
        if !self.started {
            return;
        }
        let limit = now + MESSAGE_AGGREGATION_WINDOW;

        let mut message = Message::default();
        let mut sent: Vec<SharedResource> = Vec::new();

        while let Some(entry) = self.core.question_queue.peek() {
            if entry.when > limit {
                break;
            }
            let entry = self.core.question_queue.pop().unwrap();
            message.questions.push((*entry.question).clone());
        }

        while let Some(entry) = self.core.resource_queue.peek() {
            if entry.when > limit {
                break;
            }
            let entry = self.core.resource_queue.pop().unwrap();

            if entry.resource.borrow().ttl == CANCELLED_TTL {
                // Cancelled while in the queue.
                continue;
            }
            if sent.iter().any(|r| Rc::ptr_eq(r, &entry.resource)) {
                // Already added to this message.
                continue;
            }
            sent.push(entry.resource.clone());

            let records = self.expand(&entry.resource);
            match entry.section {
                ResourceSection::Answer => message.answers.extend(records),
                ResourceSection::Authority => message.authorities.extend(records),
                ResourceSection::Additional => message.additionals.extend(records),
                ResourceSection::Expired => {
                    debug_assert!(false, "expired record queued for transmission");
                }
            }
        }

        if message.questions.is_empty()
            && message.answers.is_empty()
            && message.authorities.is_empty()
            && message.additionals.is_empty()
        {
            return;
        }

        if message.questions.is_empty() {
            message.header.response = true;
            message.header.authoritative = true;
        }

        if self.verbose {
            log::info!("outbound message: {message}");
        }

        match message.pack() {
            Ok(raw) => self.write_outs.push_back(TaggedBytesMut {
                now,
                transport: TransportContext {
                    local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
                    peer_addr: MDNS_DEST_ADDR,
                    transport_protocol: TransportProtocol::UDP,
                    ecn: None,
                },
                message: BytesMut::from(&raw[..]),
            }),
            Err(err) => log::error!("failed to pack outbound message: {err}"),
        }

        // A goodbye goes out exactly once; rewrite it to the cancelled
        // sentinel so later assemblies skip it.
        for resource in sent {
            let mut resource = resource.borrow_mut();
            if resource.ttl == 0 {
                resource.ttl = CANCELLED_TTL;
            }
        }
    }

    // A queued record becomes itself, except for the address placeholder,
    // which becomes one A/AAAA record per configured local address.
    fn expand(&self, resource: &SharedResource) -> Vec<Resource> {
        let is_placeholder = self
            .core
            .address_placeholder
            .as_ref()
            .is_some_and(|p| Rc::ptr_eq(p, resource));
        let record = resource.borrow();
        if !is_placeholder {
            return vec![record.clone()];
        }

        let mut records = Vec::with_capacity(self.config.local_ips.len());
        for ip in &self.config.local_ips {
            let rdata = match ip {
                IpAddr::V4(v4) => RData::A(*v4),
                IpAddr::V6(v6) => RData::Aaaa(*v6),
            };
            records.push(Resource {
                name: record.name.clone(),
                class: record.class,
                cache_flush: record.cache_flush,
                ttl: record.ttl,
                rdata,
            });
        }
        if records.is_empty() {
            log::warn!("no local addresses configured; address records omitted");
        }
        records
    }

    // Computes the next wake-up from the three queue heads and arms a timer
    // for it, unless one is already armed at or before that point.
    fn post_task(&mut self) {
        let mut when: Option<Instant> = None;
        if let Some(entry) = self.core.wake_queue.peek() {
            when = Some(entry.when);
        }
        if let Some(entry) = self.core.question_queue.peek()
            && when.is_none_or(|w| entry.when < w)
        {
            when = Some(entry.when);
        }
        if let Some(entry) = self.core.resource_queue.peek()
            && when.is_none_or(|w| entry.when < w)
        {
            when = Some(entry.when);
        }

        let Some(when) = when else {
            return;
        };

        if let Some(&Reverse(armed)) = self.post_task_queue.peek()
            && armed <= when
        {
            // Already scheduled to wake up by `when`.
            return;
        }

        self.post_task_queue.push(Reverse(when));
    }
}

impl sansio::Protocol<TaggedBytesMut, (), ()> for Mdns {
    type Rout = ();
    type Wout = TaggedBytesMut;
    type Eout = MdnsEvent;
    type Error = Error;
    type Time = Instant;

    /// Processes one inbound mDNS packet: every question goes to every
    /// agent, every resource goes to the renewer and then every agent in
    /// section order, end-of-message follows, and finally the engine
    /// assembles an outbound message and re-arms its timer.
    fn handle_read(&mut self, msg: TaggedBytesMut) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        if !self.started {
            return Ok(());
        }

        let mut message = Message::default();
        if let Err(err) = message.unpack(&msg.message) {
            // Malformed packets die here; no agent hears about them.
            log::warn!(
                "dropping unparseable packet from {}: {err}",
                msg.transport.peer_addr
            );
            return Ok(());
        }

        if self.verbose {
            log::info!("inbound message from {}: {message}", msg.transport.peer_addr);
        }

        let now = msg.now;

        for question in &message.questions {
            for agent in self.agents.values_mut() {
                agent.receive_question(question, &mut self.core, now);
            }
            self.drain_deferred(now);
        }

        for (resources, section) in [
            (&message.answers, ResourceSection::Answer),
            (&message.authorities, ResourceSection::Authority),
            (&message.additionals, ResourceSection::Additional),
        ] {
            for resource in resources {
                // Renewer first, so agents see refreshed state.
                self.renewer
                    .receive_resource(resource, section, &mut self.core, now);
                for agent in self.agents.values_mut() {
                    agent.receive_resource(resource, section, &mut self.core, now);
                }
                self.drain_deferred(now);
            }
        }

        self.renewer.end_of_message(&mut self.core, now);
        for agent in self.agents.values_mut() {
            agent.end_of_message(&mut self.core, now);
        }
        self.drain_deferred(now);

        self.send_message(now);
        self.post_task();
        Ok(())
    }

    /// The engine produces no read output; discovery results arrive via
    /// [`poll_event`](sansio::Protocol::poll_event).
    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    /// Not used; outbound traffic originates from agents.
    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    /// The next assembled packet to send to the multicast group.
    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.write_outs.pop_front()
    }

    /// Not used.
    fn handle_event(&mut self, _evt: ()) -> Result<()> {
        Ok(())
    }

    /// The next discovery event.
    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.core.events.pop_front()
    }

    /// The armed timer fired: drop the armed stamps that are due, wake every
    /// agent whose time has come, then assemble and re-arm.
    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }

        while let Some(&Reverse(armed)) = self.post_task_queue.peek() {
            if armed > now {
                break;
            }
            self.post_task_queue.pop();
        }

        loop {
            let due = self
                .core
                .wake_queue
                .peek()
                .is_some_and(|entry| entry.when <= now);
            if !due {
                break;
            }
            let agent_name = self.core.wake_queue.pop().unwrap().agent_name;

            if agent_name == ResourceRenewer::NAME {
                self.renewer.wake(&mut self.core, now);
            } else if let Some(agent) = self.agents.get_mut(&agent_name) {
                agent.wake(&mut self.core, now);
            } else {
                // The agent finished before its wake came up.
                log::trace!("wake for removed agent {agent_name}");
            }
            self.drain_deferred(now);
        }

        self.send_message(now);
        self.post_task();
        Ok(())
    }

    /// The earliest armed wake-up, if any.
    fn poll_timeout(&mut self) -> Option<Self::Time> {
        self.post_task_queue.peek().map(|&Reverse(when)| when)
    }

    /// Full teardown: drops every agent and queued entry. Unlike
    /// [`stop`](Mdns::stop), the engine cannot be restarted afterwards.
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.started = false;
        self.agents.clear();
        self.renewer = ResourceRenewer::default();
        self.core = EngineCore::new();
        self.post_task_queue.clear();
        self.write_outs.clear();
        Ok(())
    }
}
