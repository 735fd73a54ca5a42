use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::name::*;
use super::packer::*;
use super::*;
use shared::error::*;

// A Resource is a DNS resource record.
//
// The record's type is derived from the active payload variant (see
// [`RData::rtype`]), so a resource's type tag can never disagree with its
// stored data, and cloning copies exactly the payload belonging to the tag.
// The cache-flush flag is the top bit of the wire-format class field
// (RFC 6762 section 10.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resource {
    pub(crate) name: Name,
    pub(crate) class: DnsClass,
    pub(crate) cache_flush: bool,
    pub(crate) ttl: u32,
    pub(crate) rdata: RData,
}

impl Default for Resource {
    fn default() -> Self {
        Resource {
            name: Name::default(),
            class: CLASS_INET,
            cache_flush: false,
            ttl: 0,
            rdata: RData::A(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resource{{Name: {}, Type: {}, Class: {}, CacheFlush: {}, TTL: {}, RData: {}}}",
            self.name,
            self.rdata.rtype(),
            self.class,
            self.cache_flush,
            self.ttl,
            self.rdata
        )
    }
}

// RData is the typed payload of a resource record.
//
// Record types with no variant here are preserved opaque, so unknown inbound
// records survive a reserialize untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ptr(Name),
    Cname(Name),
    Ns(Name),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: Name,
    },
    /// Ordered list of character-strings.
    Txt(Vec<Vec<u8>>),
    /// Next-domain plus the raw window-block type bitmap (RFC 4034 section 4.1).
    Nsec {
        next_domain: Name,
        type_bitmap: Vec<u8>,
    },
    /// A record type this crate has no model for; raw type and RDATA.
    Opaque {
        typ: u16,
        data: Vec<u8>,
    },
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(addr) => write!(f, "A{{{addr}}}"),
            RData::Aaaa(addr) => write!(f, "AAAA{{{addr}}}"),
            RData::Ptr(ptr) => write!(f, "PTR{{{ptr}}}"),
            RData::Cname(cname) => write!(f, "CNAME{{{cname}}}"),
            RData::Ns(ns) => write!(f, "NS{{{ns}}}"),
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "SRV{{{priority} {weight} {port} {target}}}"),
            RData::Txt(txt) => {
                let v: Vec<String> = txt
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                write!(f, "TXT{{{}}}", v.join(", "))
            }
            RData::Nsec {
                next_domain,
                type_bitmap,
            } => write!(f, "NSEC{{{next_domain}, {} bitmap bytes}}", type_bitmap.len()),
            RData::Opaque { typ, data } => write!(f, "OPAQUE{{type {typ}, {} bytes}}", data.len()),
        }
    }
}

impl RData {
    // rtype returns the record type belonging to the active payload variant.
    pub(crate) fn rtype(&self) -> DnsType {
        match self {
            RData::A(_) => DnsType::A,
            RData::Aaaa(_) => DnsType::Aaaa,
            RData::Ptr(_) => DnsType::Ptr,
            RData::Cname(_) => DnsType::Cname,
            RData::Ns(_) => DnsType::Ns,
            RData::Srv { .. } => DnsType::Srv,
            RData::Txt(_) => DnsType::Txt,
            RData::Nsec { .. } => DnsType::Nsec,
            RData::Opaque { typ, .. } => DnsType::from(*typ),
        }
    }

    fn rtype_u16(&self) -> u16 {
        match self {
            RData::Opaque { typ, .. } => *typ,
            _ => self.rtype() as u16,
        }
    }

    // pack appends the wire format of the payload (RDATA only) to msg.
    //
    // PTR, CNAME and NS target names take part in compression; SRV targets
    // and NSEC next-domains are packed uncompressed (RFC 2782 / RFC 3845
    // require the uncompressed form, and mDNS peers reject the alternative).
    fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        match self {
            RData::A(addr) => Ok(pack_bytes(msg, &addr.octets())),
            RData::Aaaa(addr) => Ok(pack_bytes(msg, &addr.octets())),
            RData::Ptr(ptr) => ptr.pack(msg, compression, compression_off),
            RData::Cname(cname) => cname.pack(msg, compression, compression_off),
            RData::Ns(ns) => ns.pack(msg, compression, compression_off),
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                let mut msg = pack_uint16(msg, *priority);
                msg = pack_uint16(msg, *weight);
                msg = pack_uint16(msg, *port);
                target.pack(msg, &mut None, compression_off)
            }
            RData::Txt(txt) => {
                if txt.is_empty() {
                    // RFC 1035 requires at least one character-string.
                    return pack_str(msg, b"");
                }
                let mut msg = msg;
                for s in txt {
                    msg = pack_str(msg, s)?;
                }
                Ok(msg)
            }
            RData::Nsec {
                next_domain,
                type_bitmap,
            } => {
                let msg = next_domain.pack(msg, &mut None, compression_off)?;
                Ok(pack_bytes(msg, type_bitmap))
            }
            RData::Opaque { data, .. } => Ok(pack_bytes(msg, data)),
        }
    }

    // unpack parses an RDATA block of the given type and length at off.
    fn unpack(typ: u16, msg: &[u8], off: usize, length: usize) -> Result<(RData, usize)> {
        let end = off + length;
        if end > msg.len() {
            return Err(Error::ErrResourceLen);
        }

        match DnsType::from(typ) {
            DnsType::A => {
                let (b, off) = unpack_bytes(msg, off, 4)?;
                Ok((RData::A(Ipv4Addr::new(b[0], b[1], b[2], b[3])), off))
            }
            DnsType::Aaaa => {
                let (b, off) = unpack_bytes(msg, off, 16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&b);
                Ok((RData::Aaaa(Ipv6Addr::from(octets)), off))
            }
            DnsType::Ptr => {
                let mut ptr = Name::default();
                let off = ptr.unpack(msg, off)?;
                Ok((RData::Ptr(ptr), off))
            }
            DnsType::Cname => {
                let mut cname = Name::default();
                let off = cname.unpack(msg, off)?;
                Ok((RData::Cname(cname), off))
            }
            DnsType::Ns => {
                let mut ns = Name::default();
                let off = ns.unpack(msg, off)?;
                Ok((RData::Ns(ns), off))
            }
            DnsType::Srv => {
                let (priority, off) = unpack_uint16(msg, off)?;
                let (weight, off) = unpack_uint16(msg, off)?;
                let (port, off) = unpack_uint16(msg, off)?;
                let mut target = Name::default();
                let off = target.unpack(msg, off)?;
                Ok((
                    RData::Srv {
                        priority,
                        weight,
                        port,
                        target,
                    },
                    off,
                ))
            }
            DnsType::Txt => {
                let mut txt = Vec::new();
                let mut off = off;
                while off < end {
                    let (s, new_off) = unpack_str(msg, off)?;
                    if new_off > end {
                        return Err(Error::ErrCalcLen);
                    }
                    txt.push(s);
                    off = new_off;
                }
                Ok((RData::Txt(txt), off))
            }
            DnsType::Nsec => {
                let mut next_domain = Name::default();
                let off = next_domain.unpack(msg, off)?;
                if off > end {
                    return Err(Error::ErrCalcLen);
                }
                let (type_bitmap, off) = unpack_bytes(msg, off, end - off)?;
                validate_type_bitmap(&type_bitmap)?;
                Ok((
                    RData::Nsec {
                        next_domain,
                        type_bitmap,
                    },
                    off,
                ))
            }
            _ => {
                let (data, off) = unpack_bytes(msg, off, length)?;
                Ok((RData::Opaque { typ, data }, off))
            }
        }
    }
}

// validate_type_bitmap checks the window-block framing of an NSEC type
// bitmap: window number, block length 1..=32, and that the blocks cover
// exactly the RDATA remainder.
fn validate_type_bitmap(bitmap: &[u8]) -> Result<()> {
    let mut off = 0;
    while off < bitmap.len() {
        if off + 2 > bitmap.len() {
            return Err(Error::ErrNsecBitmap);
        }
        let block_len = bitmap[off + 1] as usize;
        if block_len == 0 || block_len > 32 {
            return Err(Error::ErrNsecBitmap);
        }
        off += 2 + block_len;
        if off > bitmap.len() {
            return Err(Error::ErrNsecBitmap);
        }
    }
    Ok(())
}

impl Resource {
    // pack appends the wire format of the Resource to msg.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = pack_uint16(msg, self.rdata.rtype_u16());
        let mut class = self.class.0 & CLASS_MASK;
        if self.cache_flush {
            class |= CLASS_CACHE_FLUSH;
        }
        msg = pack_uint16(msg, class);
        msg = pack_uint32(msg, self.ttl);

        // Pack a zero length, then fix it up once the body size is known.
        let len_off = msg.len();
        msg = pack_uint16(msg, 0);
        let pre_len = msg.len();

        msg = self.rdata.pack(msg, compression, compression_off)?;

        if msg.len() < pre_len || msg.len() > pre_len + u16::MAX as usize {
            return Err(Error::ErrResTooLong);
        }
        let con_len = msg.len() - pre_len;
        msg[len_off] = ((con_len >> 8) & 0xFF) as u8;
        msg[len_off + 1] = (con_len & 0xFF) as u8;

        Ok(msg)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut name = Name::default();
        let off = name.unpack(msg, off)?;
        let (typ, off) = unpack_uint16(msg, off)?;
        let (class, off) = unpack_uint16(msg, off)?;
        let (ttl, off) = unpack_uint32(msg, off)?;
        let (length, off) = unpack_uint16(msg, off)?;

        let (rdata, off) = RData::unpack(typ, msg, off, length as usize)?;

        self.name = name;
        self.class = DnsClass(class & CLASS_MASK);
        self.cache_flush = (class & CLASS_CACHE_FLUSH) != 0;
        self.ttl = ttl;
        self.rdata = rdata;
        Ok(off)
    }
}
