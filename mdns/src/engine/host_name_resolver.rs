use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::rc::Rc;
use std::time::Instant;

use crate::message::name::Name;
use crate::message::question::Question;
use crate::message::resource::{RData, Resource};
use crate::message::{CLASS_INET, DnsType};

use super::agent::{Agent, EngineCore, ResourceSection};
use super::MdnsEvent;

/// Time-bounded lookup of a remote host's address records. Emits
/// [`MdnsEvent::HostNameResolved`] exactly once: as soon as both families
/// have answered, or at the deadline with whatever arrived by then.
pub(crate) struct HostNameResolver {
    host_name: String,
    host_full_name: String,
    deadline: Instant,
    v4: Option<Ipv4Addr>,
    v6: Option<Ipv6Addr>,
    done: bool,
}

impl HostNameResolver {
    pub(crate) fn new(host_name: String, host_full_name: String, deadline: Instant) -> Self {
        HostNameResolver {
            host_name,
            host_full_name,
            deadline,
            v4: None,
            v6: None,
            done: false,
        }
    }

    fn finish(&mut self, core: &mut EngineCore) {
        if self.done {
            return;
        }
        self.done = true;

        let address = self
            .v4
            .map(IpAddr::V4)
            .or_else(|| self.v6.map(IpAddr::V6));
        core.post_event(MdnsEvent::HostNameResolved {
            host_name: self.host_name.clone(),
            address,
        });
        core.remove_agent(&self.host_full_name);
    }
}

impl Agent for HostNameResolver {
    fn start(&mut self, core: &mut EngineCore, now: Instant) {
        let name = match Name::new(&self.host_full_name) {
            Ok(name) => name,
            Err(err) => {
                log::warn!("unusable host name {}: {err}", self.host_full_name);
                self.finish(core);
                return;
            }
        };

        for typ in [DnsType::A, DnsType::Aaaa] {
            let question = Rc::new(Question {
                name: name.clone(),
                typ,
                class: CLASS_INET,
                unicast_response: false,
            });
            core.send_question(question, now);
        }
        core.wake_at(&self.host_full_name, self.deadline);
    }

    fn wake(&mut self, core: &mut EngineCore, now: Instant) {
        if now >= self.deadline {
            self.finish(core);
        }
    }

    fn receive_resource(
        &mut self,
        resource: &Resource,
        section: ResourceSection,
        core: &mut EngineCore,
        _now: Instant,
    ) {
        if section == ResourceSection::Expired || resource.name.data != self.host_full_name {
            return;
        }

        match resource.rdata {
            RData::A(addr) => self.v4 = Some(addr),
            RData::Aaaa(addr) => self.v6 = Some(addr),
            _ => return,
        }

        if self.v4.is_some() && self.v6.is_some() {
            self.finish(core);
        }
    }

    fn quit(&mut self, core: &mut EngineCore, _now: Instant) {
        self.finish(core);
    }
}
