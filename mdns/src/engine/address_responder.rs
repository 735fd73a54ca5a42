use std::time::Instant;

use crate::message::DnsType;
use crate::message::question::Question;

use super::agent::{Agent, EngineCore, ResourceSection};

/// Answers A/AAAA queries for the local host with the shared address
/// placeholder.
pub(crate) struct AddressResponder {
    host_full_name: String,
}

impl AddressResponder {
    pub(crate) const NAME: &'static str = "addresses";

    pub(crate) fn new(host_full_name: String) -> Self {
        AddressResponder { host_full_name }
    }
}

impl Agent for AddressResponder {
    fn start(&mut self, _core: &mut EngineCore, _now: Instant) {}

    fn receive_question(&mut self, question: &Question, core: &mut EngineCore, now: Instant) {
        if question.name.data == self.host_full_name
            && matches!(question.typ, DnsType::A | DnsType::Aaaa | DnsType::All)
        {
            core.send_addresses(ResourceSection::Answer, now);
        }
    }

    fn quit(&mut self, _core: &mut EngineCore, _now: Instant) {}
}
