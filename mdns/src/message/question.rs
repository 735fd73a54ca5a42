use std::collections::HashMap;
use std::fmt;

use super::name::*;
use super::packer::*;
use super::*;
use shared::error::Result;

// A Question is a DNS query.
//
// The unicast-response flag is the top bit of the wire-format class field
// (RFC 6762 section 5.4); it is split out here and folded back when packing.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub(crate) struct Question {
    pub(crate) name: Name,
    pub(crate) typ: DnsType,
    pub(crate) class: DnsClass,
    pub(crate) unicast_response: bool,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Question{{Name: {}, Type: {}, Class: {}, UnicastResponse: {}}}",
            self.name, self.typ, self.class, self.unicast_response
        )
    }
}

impl Question {
    // pack appends the wire format of the Question to msg.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = self.typ.pack(msg);
        let mut class = self.class.0 & CLASS_MASK;
        if self.unicast_response {
            class |= CLASS_UNICAST_RESPONSE;
        }
        Ok(pack_uint16(msg, class))
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut name = Name::default();
        let off = name.unpack(msg, off)?;
        let (typ, off) = unpack_uint16(msg, off)?;
        let (class, off) = unpack_uint16(msg, off)?;

        self.name = name;
        self.typ = DnsType::from(typ);
        self.class = DnsClass(class & CLASS_MASK);
        self.unicast_response = (class & CLASS_UNICAST_RESPONSE) != 0;
        Ok(off)
    }
}
