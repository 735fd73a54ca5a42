use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;
use std::time::Instant;

use crate::message::question::Question;
use crate::message::resource::Resource;

use super::MdnsEvent;

/// Where a resource record was seen, or where an outbound record should be
/// placed. `Expired` is an engine-internal signal: such records are fanned
/// out to the local agents and never transmitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ResourceSection {
    Answer,
    Authority,
    Additional,
    Expired,
}

/// Questions are queued shared so the same instance can be scheduled twice.
pub(crate) type SharedQuestion = Rc<Question>;

/// Records are shared between agents and queue entries; identity
/// de-duplication and in-place TTL rewrites go through this handle.
pub(crate) type SharedResource = Rc<RefCell<Resource>>;

// A named protocol participant multiplexed by the engine. Agents interact
// with the network only by calling back into the scheduling context handed to
// every callback; an agent removes itself when it is finished.
pub(crate) trait Agent {
    fn start(&mut self, core: &mut EngineCore, now: Instant);

    fn wake(&mut self, core: &mut EngineCore, now: Instant) {
        let _ = (core, now);
    }

    fn receive_question(&mut self, question: &Question, core: &mut EngineCore, now: Instant) {
        let _ = (question, core, now);
    }

    fn receive_resource(
        &mut self,
        resource: &Resource,
        section: ResourceSection,
        core: &mut EngineCore,
        now: Instant,
    ) {
        let _ = (resource, section, core, now);
    }

    fn end_of_message(&mut self, core: &mut EngineCore, now: Instant) {
        let _ = (core, now);
    }

    fn quit(&mut self, core: &mut EngineCore, now: Instant);
}

pub(crate) struct WakeEntry {
    pub(crate) when: Instant,
    seq: u64,
    pub(crate) agent_name: String,
}

pub(crate) struct QuestionEntry {
    pub(crate) when: Instant,
    seq: u64,
    pub(crate) question: SharedQuestion,
}

pub(crate) struct ResourceEntry {
    pub(crate) when: Instant,
    seq: u64,
    pub(crate) resource: SharedResource,
    pub(crate) section: ResourceSection,
}

// The queues are min-heaps on (when, seq): BinaryHeap is a max-heap, so the
// orderings below are reversed. The sequence number keeps draining stable for
// entries scheduled at the same instant.
macro_rules! min_heap_order {
    ($entry:ident) => {
        impl PartialEq for $entry {
            fn eq(&self, other: &Self) -> bool {
                self.when == other.when && self.seq == other.seq
            }
        }

        impl Eq for $entry {}

        impl PartialOrd for $entry {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $entry {
            fn cmp(&self, other: &Self) -> Ordering {
                other
                    .when
                    .cmp(&self.when)
                    .then_with(|| other.seq.cmp(&self.seq))
            }
        }
    };
}

min_heap_order!(WakeEntry);
min_heap_order!(QuestionEntry);
min_heap_order!(ResourceEntry);

/// The scheduling context of the engine: the three time-ordered queues, the
/// client event queue, and the lists of actions agents request during a
/// dispatch round (renewals, expirations, removals), applied by the engine
/// when the round ends.
pub(crate) struct EngineCore {
    pub(crate) host_full_name: String,
    pub(crate) address_placeholder: Option<SharedResource>,

    pub(crate) wake_queue: BinaryHeap<WakeEntry>,
    pub(crate) question_queue: BinaryHeap<QuestionEntry>,
    pub(crate) resource_queue: BinaryHeap<ResourceEntry>,
    seq: u64,

    pub(crate) renewals: Vec<Resource>,
    pub(crate) expirations: Vec<Resource>,
    pub(crate) removals: Vec<String>,
    pub(crate) events: VecDeque<MdnsEvent>,
}

impl EngineCore {
    pub(crate) fn new() -> Self {
        EngineCore {
            host_full_name: String::new(),
            address_placeholder: None,
            wake_queue: BinaryHeap::new(),
            question_queue: BinaryHeap::new(),
            resource_queue: BinaryHeap::new(),
            seq: 0,
            renewals: Vec::new(),
            expirations: Vec::new(),
            removals: Vec::new(),
            events: VecDeque::new(),
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Schedules a wake-up call for the named agent.
    pub(crate) fn wake_at(&mut self, agent_name: &str, when: Instant) {
        let seq = self.next_seq();
        self.wake_queue.push(WakeEntry {
            when,
            seq,
            agent_name: agent_name.to_owned(),
        });
    }

    /// Queues a question for transmission at `when`.
    pub(crate) fn send_question(&mut self, question: SharedQuestion, when: Instant) {
        let seq = self.next_seq();
        self.question_queue.push(QuestionEntry {
            when,
            seq,
            question,
        });
    }

    /// Queues a record for transmission at `when`, or, for the `Expired`
    /// section, hands it to every agent instead (expirations are internal
    /// signals and are never transmitted).
    pub(crate) fn send_resource(
        &mut self,
        resource: SharedResource,
        section: ResourceSection,
        when: Instant,
    ) {
        if section == ResourceSection::Expired {
            self.expirations.push(resource.borrow().clone());
            return;
        }

        let seq = self.next_seq();
        self.resource_queue.push(ResourceEntry {
            when,
            seq,
            resource,
            section,
        });
    }

    /// Queues the shared address placeholder; assembly substitutes the
    /// configured per-interface A/AAAA records when the message is built.
    pub(crate) fn send_addresses(&mut self, section: ResourceSection, when: Instant) {
        let Some(placeholder) = self.address_placeholder.clone() else {
            debug_assert!(false, "send_addresses before engine start");
            return;
        };
        self.send_resource(placeholder, section, when);
    }

    /// Hands a freshly received record to the resource renewer for TTL
    /// tracking.
    pub(crate) fn renew(&mut self, resource: &Resource) {
        self.renewals.push(resource.clone());
    }

    /// Removes the named agent from the registry once the current dispatch
    /// round ends.
    pub(crate) fn remove_agent(&mut self, name: &str) {
        self.removals.push(name.to_owned());
    }

    /// Queues a client-facing event.
    pub(crate) fn post_event(&mut self, event: MdnsEvent) {
        self.events.push_back(event);
    }
}
