#[cfg(test)]
mod message_test;

pub(crate) mod header;
pub(crate) mod name;
mod packer;
pub(crate) mod parser;
pub(crate) mod question;
pub(crate) mod resource;

use std::collections::HashMap;
use std::fmt;

use header::*;
use packer::*;
use parser::*;
use question::*;
use resource::*;

use shared::error::*;

// Message formats

// A DnsType is a type of DNS request and response.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum DnsType {
    // ResourceHeader.Type and question.Type
    A = 1,
    Ns = 2,
    Cname = 5,
    Ptr = 12,
    Txt = 16,
    Aaaa = 28,
    Srv = 33,
    Nsec = 47,

    // question.Type
    All = 255,

    #[default]
    Unsupported = 0,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            2 => DnsType::Ns,
            5 => DnsType::Cname,
            12 => DnsType::Ptr,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            47 => DnsType::Nsec,
            255 => DnsType::All,
            _ => DnsType::Unsupported,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Ns => "NS",
            DnsType::Cname => "CNAME",
            DnsType::Ptr => "PTR",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::Nsec => "NSEC",
            DnsType::All => "ANY",
            _ => "Unsupported",
        };
        write!(f, "{s}")
    }
}

impl DnsType {
    // pack appends the wire format of the type to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, *self as u16)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (t, o) = unpack_uint16(msg, off)?;
        *self = DnsType::from(t);
        Ok(o)
    }
}

// A DnsClass is a type of network.
///
/// Only `CLASS_INET` matters in practice; `CLASS_ANY` is accepted in
/// questions. The top bit of the wire-format class field is not part of the
/// class: on resources it is the cache-flush bit and on questions the
/// unicast-response bit (RFC 6762), split out during parsing.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct DnsClass(pub(crate) u16);

/// Internet class (IN).
pub(crate) const CLASS_INET: DnsClass = DnsClass(1);

/// Any class (*) - matches any class in queries.
pub(crate) const CLASS_ANY: DnsClass = DnsClass(255);

/// Mask selecting the class bits of the wire-format class field.
pub(crate) const CLASS_MASK: u16 = 0x7FFF;

/// Top bit of the resource class field: cache-flush (RFC 6762 section 10.2).
pub(crate) const CLASS_CACHE_FLUSH: u16 = 0x8000;

/// Top bit of the question class field: unicast-response (RFC 6762 section 5.4).
pub(crate) const CLASS_UNICAST_RESPONSE: u16 = 0x8000;

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let other = format!("{}", self.0);
        let s = match *self {
            CLASS_INET => "ClassINET",
            CLASS_ANY => "ClassANY",
            _ => other.as_str(),
        };
        write!(f, "{s}")
    }
}

impl DnsClass {
    // pack appends the wire format of the class to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, self.0)
    }
}

// An OpCode is a DNS operation code.
pub(crate) type OpCode = u16;

// An RCode is a DNS response status code.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RCode {
    #[default]
    Success = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
    Unsupported,
}

impl From<u8> for RCode {
    fn from(v: u8) -> Self {
        match v {
            0 => RCode::Success,
            1 => RCode::FormatError,
            2 => RCode::ServerFailure,
            3 => RCode::NameError,
            4 => RCode::NotImplemented,
            5 => RCode::Refused,
            _ => RCode::Unsupported,
        }
    }
}

impl fmt::Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RCode::Success => "RCodeSuccess",
            RCode::FormatError => "RCodeFormatError",
            RCode::ServerFailure => "RCodeServerFailure",
            RCode::NameError => "RCodeNameError",
            RCode::NotImplemented => "RCodeNotImplemented",
            RCode::Refused => "RCodeRefused",
            RCode::Unsupported => "RCodeUnsupported",
        };
        write!(f, "{s}")
    }
}

// Internal constants.

// PACK_STARTING_CAP is the default initial buffer size allocated during
// packing.
//
// The starting capacity doesn't matter too much, but most DNS responses
// will be <= 512 bytes as it is the limit for DNS over UDP.
const PACK_STARTING_CAP: usize = 512;

// UINT16LEN is the length (in bytes) of a uint16.
const UINT16LEN: usize = 2;

// UINT32LEN is the length (in bytes) of a uint32.
const UINT32LEN: usize = 4;

// HEADER_LEN is the length (in bytes) of a DNS header.
//
// A header is comprised of 6 uint16s and no padding.
const HEADER_LEN: usize = 6 * UINT16LEN;

const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
const HEADER_BIT_TC: u16 = 1 << 9; // truncated
const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
const HEADER_BIT_RA: u16 = 1 << 7; // recursion available

// Message is a representation of a DNS message.
#[derive(Default, Debug)]
pub(crate) struct Message {
    pub(crate) header: Header,
    pub(crate) questions: Vec<Question>,
    pub(crate) answers: Vec<Resource>,
    pub(crate) authorities: Vec<Resource>,
    pub(crate) additionals: Vec<Resource>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = "Message{Header: ".to_owned();
        s += self.header.to_string().as_str();

        s += ", Questions: ";
        let v: Vec<String> = self.questions.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        s += ", Answers: ";
        let v: Vec<String> = self.answers.iter().map(|r| r.to_string()).collect();
        s += &v.join(", ");

        s += ", Authorities: ";
        let v: Vec<String> = self.authorities.iter().map(|r| r.to_string()).collect();
        s += &v.join(", ");

        s += ", Additionals: ";
        let v: Vec<String> = self.additionals.iter().map(|r| r.to_string()).collect();
        s += &v.join(", ");

        write!(f, "{s}}}")
    }
}

impl Message {
    // unpack parses a full Message.
    pub(crate) fn unpack(&mut self, msg: &[u8]) -> Result<()> {
        let mut p = Parser::default();
        self.header = p.start(msg)?;
        self.questions = p.all_questions()?;
        self.answers = p.all_answers()?;
        self.authorities = p.all_authorities()?;
        self.additionals = p.all_additionals()?;
        Ok(())
    }

    // pack packs a full Message.
    pub(crate) fn pack(&self) -> Result<Vec<u8>> {
        self.append_pack(Vec::with_capacity(PACK_STARTING_CAP))
    }

    // append_pack is like pack but appends the full Message to b and returns
    // the extended buffer.
    //
    // The header's section counts are written from the actual sequence
    // lengths, so they can never disagree with the packed sections.
    pub(crate) fn append_pack(&self, b: Vec<u8>) -> Result<Vec<u8>> {
        // Validate the lengths. It is very unlikely that anyone will try to
        // pack more than 65535 of any particular type, but it is possible and
        // we should fail gracefully.
        if self.questions.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyQuestions);
        }
        if self.answers.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAnswers);
        }
        if self.authorities.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAuthorities);
        }
        if self.additionals.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAdditionals);
        }

        let (id, bits) = self.header.pack();

        let h = HeaderInternal {
            id,
            bits,
            questions: self.questions.len() as u16,
            answers: self.answers.len() as u16,
            authorities: self.authorities.len() as u16,
            additionals: self.additionals.len() as u16,
        };

        let compression_off = b.len();
        let mut msg = h.pack(b);

        // RFC 1035 allows (but does not require) compression for packing. RFC
        // 1035 requires unpacking implementations to support compression, so
        // unconditionally enabling it is fine.
        //
        // DNS lookups are typically done over UDP, and RFC 1035 states that UDP
        // DNS messages can be a maximum of 512 bytes long. Without compression,
        // many DNS response messages are over this limit, so enabling
        // compression will help ensure compliance.
        let mut compression = Some(HashMap::new());

        for question in &self.questions {
            msg = question.pack(msg, &mut compression, compression_off)?;
        }
        for answer in &self.answers {
            msg = answer.pack(msg, &mut compression, compression_off)?;
        }
        for authority in &self.authorities {
            msg = authority.pack(msg, &mut compression, compression_off)?;
        }
        for additional in &self.additionals {
            msg = additional.pack(msg, &mut compression, compression_off)?;
        }

        Ok(msg)
    }
}
