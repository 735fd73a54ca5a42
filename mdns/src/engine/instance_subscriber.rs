use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::rc::Rc;
use std::time::{Duration, Instant};

use shared::error::Result;

use crate::config::{QUERY_INITIAL_INTERVAL, QUERY_MAX_INTERVAL};
use crate::message::name::Name;
use crate::message::question::Question;
use crate::message::resource::{RData, Resource};
use crate::message::{CLASS_INET, DnsType};
use crate::names;

use super::agent::{Agent, EngineCore, ResourceSection, SharedQuestion};
use super::{InstanceChange, MdnsEvent, ServiceInstance};

#[derive(Default)]
struct InstanceState {
    target: Option<String>,
    port: Option<u16>,
    text: Vec<String>,
    v4: Option<Ipv4Addr>,
    v6: Option<Ipv6Addr>,
    // Discovered has been emitted for this instance.
    announced: bool,
    dirty: bool,
    lost: bool,
}

impl InstanceState {
    fn complete(&self) -> bool {
        self.port.is_some() && (self.v4.is_some() || self.v6.is_some())
    }

    fn address(&self) -> Option<IpAddr> {
        self.v4.map(IpAddr::V4).or_else(|| self.v6.map(IpAddr::V6))
    }
}

/// Maintains a live set of instances of one service type. Instance state is
/// merged from PTR/SRV/TXT/A/AAAA sightings; discovery, change and loss are
/// reported through [`MdnsEvent::ServiceInstance`] at end-of-message.
pub(crate) struct InstanceSubscriber {
    service_name: String,
    service_full_name: String,
    question: SharedQuestion,
    query_interval: Duration,
    // Keyed by instance full name.
    instances: HashMap<String, InstanceState>,
}

impl InstanceSubscriber {
    pub(crate) fn new(service_name: String, service_full_name: String) -> Result<Self> {
        let question = Rc::new(Question {
            name: Name::new(&service_full_name)?,
            typ: DnsType::Ptr,
            class: CLASS_INET,
            unicast_response: false,
        });
        Ok(InstanceSubscriber {
            service_name,
            service_full_name,
            question,
            query_interval: QUERY_INITIAL_INTERVAL,
            instances: HashMap::new(),
        })
    }

    fn emit(&self, core: &mut EngineCore, change: InstanceChange, key: &str, state: &InstanceState) {
        core.post_event(MdnsEvent::ServiceInstance {
            change,
            instance: ServiceInstance {
                service: self.service_name.clone(),
                instance: names::instance_label(key).to_owned(),
                address: state.address(),
                port: state.port.unwrap_or(0),
                text: state.text.clone(),
            },
        });
    }

    // Expirations come from the renewer outside any inbound message, so there
    // is no end-of-message batching point; report them right away.
    fn handle_expiration(&mut self, resource: &Resource, core: &mut EngineCore) {
        match &resource.rdata {
            RData::Ptr(target) if resource.name.data == self.service_full_name => {
                if let Some(state) = self.instances.remove(&target.data)
                    && state.announced
                {
                    self.emit(core, InstanceChange::Lost, &target.data, &state);
                }
            }
            RData::Srv { .. } => {
                if let Some(state) = self.instances.remove(&resource.name.data)
                    && state.announced
                {
                    self.emit(core, InstanceChange::Lost, &resource.name.data, &state);
                }
            }
            RData::Txt(_) => {
                if let Some(state) = self.instances.get_mut(&resource.name.data)
                    && !state.text.is_empty()
                {
                    state.text.clear();
                    if state.announced {
                        let state = &self.instances[&resource.name.data];
                        self.emit(core, InstanceChange::Changed, &resource.name.data, state);
                    }
                }
            }
            RData::A(_) | RData::Aaaa(_) => {
                let keys: Vec<String> = self
                    .instances
                    .iter()
                    .filter(|(_, s)| s.target.as_deref() == Some(resource.name.data.as_str()))
                    .map(|(k, _)| k.clone())
                    .collect();
                for key in keys {
                    let state = self.instances.get_mut(&key).unwrap();
                    match resource.rdata {
                        RData::A(_) => state.v4 = None,
                        _ => state.v6 = None,
                    }
                    if !state.announced {
                        continue;
                    }
                    if state.complete() {
                        let state = &self.instances[&key];
                        self.emit(core, InstanceChange::Changed, &key, state);
                    } else {
                        let state = self.instances.remove(&key).unwrap();
                        self.emit(core, InstanceChange::Lost, &key, &state);
                    }
                }
            }
            _ => {}
        }
    }
}

impl Agent for InstanceSubscriber {
    fn start(&mut self, core: &mut EngineCore, now: Instant) {
        core.send_question(self.question.clone(), now);
        core.wake_at(&self.service_full_name, now + self.query_interval);
    }

    fn wake(&mut self, core: &mut EngineCore, now: Instant) {
        core.send_question(self.question.clone(), now);
        self.query_interval = (self.query_interval * 2).min(QUERY_MAX_INTERVAL);
        core.wake_at(&self.service_full_name, now + self.query_interval);
    }

    fn receive_resource(
        &mut self,
        resource: &Resource,
        section: ResourceSection,
        core: &mut EngineCore,
        _now: Instant,
    ) {
        if section == ResourceSection::Expired {
            self.handle_expiration(resource, core);
            return;
        }

        // A goodbye record (TTL 0) inside a message marks the instance lost;
        // the loss is reported with the rest of the message's changes at
        // end-of-message.
        let goodbye = resource.ttl == 0;

        match &resource.rdata {
            RData::Ptr(target) if resource.name.data == self.service_full_name => {
                let key = target.data.clone();
                if goodbye {
                    if let Some(state) = self.instances.get_mut(&key) {
                        state.lost = true;
                        state.dirty = true;
                    }
                    return;
                }
                // A PTR for a known instance carries nothing new; only a
                // first sighting dirties the state.
                self.instances.entry(key).or_insert_with(|| InstanceState {
                    dirty: true,
                    ..Default::default()
                });
                core.renew(resource);
            }
            RData::Srv { port, target, .. } => {
                let Some(state) = self.instances.get_mut(&resource.name.data) else {
                    return;
                };
                if goodbye {
                    state.lost = true;
                    state.dirty = true;
                    return;
                }
                if state.port != Some(*port) || state.target.as_deref() != Some(target.data.as_str()) {
                    state.port = Some(*port);
                    state.target = Some(target.data.clone());
                    state.dirty = true;
                }
                core.renew(resource);
            }
            RData::Txt(text) => {
                let Some(state) = self.instances.get_mut(&resource.name.data) else {
                    return;
                };
                if goodbye {
                    if !state.text.is_empty() {
                        state.text.clear();
                        state.dirty = true;
                    }
                    return;
                }
                let text: Vec<String> = text
                    .iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                if state.text != text {
                    state.text = text;
                    state.dirty = true;
                }
                core.renew(resource);
            }
            RData::A(addr) => {
                for state in self.instances.values_mut() {
                    if state.target.as_deref() != Some(resource.name.data.as_str()) {
                        continue;
                    }
                    if goodbye {
                        if state.v4.take().is_some() {
                            state.dirty = true;
                        }
                    } else if state.v4 != Some(*addr) {
                        state.v4 = Some(*addr);
                        state.dirty = true;
                    }
                }
            }
            RData::Aaaa(addr) => {
                for state in self.instances.values_mut() {
                    if state.target.as_deref() != Some(resource.name.data.as_str()) {
                        continue;
                    }
                    if goodbye {
                        if state.v6.take().is_some() {
                            state.dirty = true;
                        }
                    } else if state.v6 != Some(*addr) {
                        state.v6 = Some(*addr);
                        state.dirty = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn end_of_message(&mut self, core: &mut EngineCore, _now: Instant) {
        let mut lost = Vec::new();
        let mut events = Vec::new();

        for (key, state) in self.instances.iter_mut() {
            if !state.dirty {
                continue;
            }
            state.dirty = false;

            if state.lost {
                lost.push(key.clone());
                continue;
            }
            if !state.complete() {
                // Wait for the rest of the records.
                continue;
            }
            let change = if state.announced {
                InstanceChange::Changed
            } else {
                state.announced = true;
                InstanceChange::Discovered
            };
            events.push((change, key.clone()));
        }

        for (change, key) in events {
            let state = &self.instances[&key];
            self.emit(core, change, &key, state);
        }

        for key in lost {
            let state = self.instances.remove(&key).unwrap();
            if state.announced {
                self.emit(core, InstanceChange::Lost, &key, &state);
            }
        }
    }

    fn quit(&mut self, core: &mut EngineCore, _now: Instant) {
        core.remove_agent(&self.service_full_name);
    }
}
