use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use shared::error::Result;

use crate::config::{ANNOUNCE_COUNT, ANNOUNCE_INTERVAL, RESOURCE_TTL};
use crate::message::name::Name;
use crate::message::question::Question;
use crate::message::resource::{RData, Resource};
use crate::message::{CLASS_INET, DnsType};

use super::agent::{Agent, EngineCore, ResourceSection, SharedResource};

/// Announces and defends a locally published service instance.
///
/// The PTR/SRV/TXT records are built once and shared: defending re-enqueues
/// the same instances (assembly de-duplicates them) and the goodbye rewrites
/// their TTLs in place.
pub(crate) struct InstancePublisher {
    instance_full_name: String,
    service_full_name: String,
    ptr: SharedResource,
    srv: SharedResource,
    txt: SharedResource,
    announcements_sent: u32,
}

impl InstancePublisher {
    pub(crate) fn new(
        host_full_name: &str,
        instance_full_name: String,
        service_full_name: String,
        port: u16,
        text: Vec<String>,
    ) -> Result<Self> {
        let service_name = Name::new(&service_full_name)?;
        let instance_name = Name::new(&instance_full_name)?;

        let ptr = Resource {
            name: service_name,
            class: CLASS_INET,
            cache_flush: false,
            ttl: RESOURCE_TTL,
            rdata: RData::Ptr(instance_name.clone()),
        };

        let srv = Resource {
            name: instance_name.clone(),
            class: CLASS_INET,
            cache_flush: true,
            ttl: RESOURCE_TTL,
            rdata: RData::Srv {
                priority: 0,
                weight: 0,
                port,
                target: Name::new(host_full_name)?,
            },
        };

        let txt = Resource {
            name: instance_name,
            class: CLASS_INET,
            cache_flush: true,
            ttl: RESOURCE_TTL,
            rdata: RData::Txt(text.into_iter().map(String::into_bytes).collect()),
        };

        Ok(InstancePublisher {
            instance_full_name,
            service_full_name,
            ptr: Rc::new(RefCell::new(ptr)),
            srv: Rc::new(RefCell::new(srv)),
            txt: Rc::new(RefCell::new(txt)),
            announcements_sent: 0,
        })
    }

    fn send_records(&self, core: &mut EngineCore, when: Instant) {
        core.send_resource(self.ptr.clone(), ResourceSection::Answer, when);
        core.send_resource(self.srv.clone(), ResourceSection::Answer, when);
        core.send_resource(self.txt.clone(), ResourceSection::Answer, when);
        core.send_addresses(ResourceSection::Additional, when);
    }

    fn announce(&mut self, core: &mut EngineCore, now: Instant) {
        self.send_records(core, now);
        self.announcements_sent += 1;
        if self.announcements_sent < ANNOUNCE_COUNT {
            core.wake_at(&self.instance_full_name, now + ANNOUNCE_INTERVAL);
        }
    }
}

impl Agent for InstancePublisher {
    fn start(&mut self, core: &mut EngineCore, now: Instant) {
        self.announce(core, now);
    }

    fn wake(&mut self, core: &mut EngineCore, now: Instant) {
        if self.announcements_sent < ANNOUNCE_COUNT {
            self.announce(core, now);
        }
    }

    fn receive_question(&mut self, question: &Question, core: &mut EngineCore, now: Instant) {
        if question.name.data == self.service_full_name
            && matches!(question.typ, DnsType::Ptr | DnsType::All)
        {
            self.send_records(core, now);
            return;
        }

        if question.name.data == self.instance_full_name {
            match question.typ {
                DnsType::Srv => {
                    core.send_resource(self.srv.clone(), ResourceSection::Answer, now);
                    core.send_addresses(ResourceSection::Additional, now);
                }
                DnsType::Txt => {
                    core.send_resource(self.txt.clone(), ResourceSection::Answer, now);
                }
                DnsType::All => {
                    self.send_records(core, now);
                }
                _ => {}
            }
        }
    }

    fn quit(&mut self, core: &mut EngineCore, now: Instant) {
        // Goodbye: the same records at TTL 0. The send path rewrites them to
        // the cancelled sentinel once transmitted, so they go out only once.
        for record in [&self.ptr, &self.srv, &self.txt] {
            record.borrow_mut().ttl = 0;
            core.send_resource(record.clone(), ResourceSection::Answer, now);
        }
        core.remove_agent(&self.instance_full_name);
    }
}
