use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::CANCELLED_TTL;
use crate::message::question::Question;
use crate::message::resource::Resource;
use crate::message::{CLASS_INET, DnsType};

use super::agent::{Agent, EngineCore, ResourceSection};

// "The querier should plan to issue a query at 80% of the record lifetime,
// and then if no answer is received, at 85%, 90%, and 95%." (RFC 6762
// section 5.2); past the last point the record expires.
const REFRESH_PERCENTS: [u32; 4] = [80, 85, 90, 95];

#[derive(Clone, PartialEq, Eq, Hash)]
struct RenewalKey {
    name: String,
    typ: DnsType,
}

impl RenewalKey {
    fn for_resource(resource: &Resource) -> Self {
        RenewalKey {
            name: resource.name.data.clone(),
            typ: resource.rdata.rtype(),
        }
    }
}

struct RenewalEntry {
    resource: Resource,
    created: Instant,
    ttl: u32,
    // Bumped whenever the record is refreshed; schedule items carrying an
    // older generation are stale and get dropped when they surface.
    generation: u64,
}

struct ScheduleItem {
    when: Instant,
    key: RenewalKey,
    generation: u64,
    phase: usize,
}

impl PartialEq for ScheduleItem {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.generation == other.generation
    }
}

impl Eq for ScheduleItem {}

impl PartialOrd for ScheduleItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduleItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the earliest item first.
        other
            .when
            .cmp(&self.when)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

/// The always-on agent that keeps tracked records alive: it schedules
/// re-queries before their TTLs run out and fans out an expiration signal
/// when a record lapses without a refresh.
#[derive(Default)]
pub(crate) struct ResourceRenewer {
    entries: HashMap<RenewalKey, RenewalEntry>,
    schedule: BinaryHeap<ScheduleItem>,
    next_generation: u64,
}

impl ResourceRenewer {
    pub(crate) const NAME: &'static str = "#renewer";

    /// Starts (or restarts) TTL tracking for `resource`.
    pub(crate) fn renew(&mut self, resource: &Resource, core: &mut EngineCore, now: Instant) {
        if resource.ttl == 0 || resource.ttl == CANCELLED_TTL {
            // A goodbye is never tracked; it retires the entry instead.
            self.entries.remove(&RenewalKey::for_resource(resource));
            return;
        }

        let key = RenewalKey::for_resource(resource);
        let generation = self.next_generation;
        self.next_generation += 1;

        self.entries.insert(
            key.clone(),
            RenewalEntry {
                resource: resource.clone(),
                created: now,
                ttl: resource.ttl,
                generation,
            },
        );

        let when = now + ttl_fraction(resource.ttl, REFRESH_PERCENTS[0]);
        self.schedule.push(ScheduleItem {
            when,
            key,
            generation,
            phase: 0,
        });
        core.wake_at(Self::NAME, when);
    }
}

fn ttl_fraction(ttl: u32, percent: u32) -> Duration {
    Duration::from_millis(ttl as u64 * percent as u64 * 10)
}

impl Agent for ResourceRenewer {
    fn start(&mut self, _core: &mut EngineCore, _now: Instant) {}

    fn wake(&mut self, core: &mut EngineCore, now: Instant) {
        while let Some(top) = self.schedule.peek() {
            if top.when > now {
                break;
            }
            let item = self.schedule.pop().unwrap();

            let Some(entry) = self.entries.get(&item.key) else {
                continue;
            };
            if entry.generation != item.generation {
                // Refreshed since this item was scheduled.
                continue;
            }

            if item.phase < REFRESH_PERCENTS.len() {
                // Re-query, then try again a little later.
                let question = Rc::new(Question {
                    name: entry.resource.name.clone(),
                    typ: entry.resource.rdata.rtype(),
                    class: CLASS_INET,
                    unicast_response: false,
                });
                core.send_question(question, now);

                let next_phase = item.phase + 1;
                let percent = REFRESH_PERCENTS
                    .get(next_phase)
                    .copied()
                    .unwrap_or(100);
                let when = entry.created + ttl_fraction(entry.ttl, percent);
                self.schedule.push(ScheduleItem {
                    when,
                    key: item.key,
                    generation: item.generation,
                    phase: next_phase,
                });
                core.wake_at(Self::NAME, when);
            } else {
                // The record lapsed; tell every agent.
                let entry = self.entries.remove(&item.key).unwrap();
                core.send_resource(
                    Rc::new(RefCell::new(entry.resource)),
                    ResourceSection::Expired,
                    now,
                );
            }
        }
    }

    fn receive_resource(
        &mut self,
        resource: &Resource,
        section: ResourceSection,
        core: &mut EngineCore,
        now: Instant,
    ) {
        if section == ResourceSection::Expired {
            return;
        }

        let key = RenewalKey::for_resource(resource);
        if !self.entries.contains_key(&key) {
            return;
        }

        if resource.ttl == 0 {
            // Goodbye from the peer; stop tracking.
            self.entries.remove(&key);
            return;
        }

        // A fresh sighting resets the whole schedule.
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries.insert(
            key.clone(),
            RenewalEntry {
                resource: resource.clone(),
                created: now,
                ttl: resource.ttl,
                generation,
            },
        );

        let when = now + ttl_fraction(resource.ttl, REFRESH_PERCENTS[0]);
        self.schedule.push(ScheduleItem {
            when,
            key,
            generation,
            phase: 0,
        });
        core.wake_at(Self::NAME, when);
    }

    fn quit(&mut self, _core: &mut EngineCore, _now: Instant) {}
}
