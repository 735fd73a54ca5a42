use std::net::{Ipv4Addr, Ipv6Addr};

use super::name::Name;
use super::question::Question;
use super::resource::{RData, Resource};
use super::*;

fn roundtrip(msg: &Message) -> Message {
    let raw = msg.pack().expect("pack");
    let mut parsed = Message::default();
    parsed.unpack(&raw).expect("unpack");
    parsed
}

fn resource(name: &str, ttl: u32, rdata: RData) -> Resource {
    Resource {
        name: Name::new(name).unwrap(),
        class: CLASS_INET,
        cache_flush: false,
        ttl,
        rdata,
    }
}

#[test]
fn test_header_bits_wire_exact() {
    let header = Header {
        id: 0x1234,
        response: true,
        op_code: 0,
        authoritative: true,
        truncated: false,
        recursion_desired: false,
        recursion_available: false,
        rcode: RCode::Success,
    };
    let (id, bits) = header.pack();
    assert_eq!(id, 0x1234);
    // QR is bit 15, AA is bit 10.
    assert_eq!(bits, 0x8400);

    let internal = HeaderInternal {
        id,
        bits,
        ..Default::default()
    };
    assert_eq!(internal.header(), header);
}

#[test]
fn test_header_counts_match_sections() {
    let msg = Message {
        questions: vec![Question {
            name: Name::new("alpha.local.").unwrap(),
            typ: DnsType::A,
            class: CLASS_INET,
            unicast_response: false,
        }],
        answers: vec![
            resource("alpha.local.", 120, RData::A(Ipv4Addr::new(192, 0, 2, 1))),
            resource("alpha.local.", 120, RData::Aaaa(Ipv6Addr::LOCALHOST)),
        ],
        additionals: vec![resource(
            "beta.local.",
            120,
            RData::A(Ipv4Addr::new(192, 0, 2, 2)),
        )],
        ..Default::default()
    };

    let raw = msg.pack().unwrap();
    let mut internal = HeaderInternal::default();
    internal.unpack(&raw, 0).unwrap();
    assert_eq!(internal.questions, 1);
    assert_eq!(internal.answers, 2);
    assert_eq!(internal.authorities, 0);
    assert_eq!(internal.additionals, 1);
}

#[test]
fn test_roundtrip_all_rdata_variants() {
    let variants = vec![
        RData::A(Ipv4Addr::new(192, 0, 2, 5)),
        RData::Aaaa("2001:db8::5".parse().unwrap()),
        RData::Ptr(Name::new("lp1._printer._tcp.local.").unwrap()),
        RData::Cname(Name::new("alias.local.").unwrap()),
        RData::Ns(Name::new("ns.local.").unwrap()),
        RData::Srv {
            priority: 0,
            weight: 5,
            port: 9100,
            target: Name::new("alpha.local.").unwrap(),
        },
        RData::Txt(vec![b"paper=A4".to_vec(), b"duplex".to_vec()]),
        RData::Nsec {
            next_domain: Name::new("alpha.local.").unwrap(),
            // Window 0, 4 bytes: bits for A (1) and AAAA (28).
            type_bitmap: vec![0, 4, 0x40, 0, 0, 0x08],
        },
    ];

    for rdata in variants {
        let msg = Message {
            answers: vec![resource("alpha.local.", 4500, rdata.clone())],
            ..Default::default()
        };
        let parsed = roundtrip(&msg);
        assert_eq!(parsed.answers.len(), 1, "variant {rdata:?}");
        assert_eq!(parsed.answers[0].rdata, rdata, "variant {rdata:?}");
        assert_eq!(parsed.answers[0].ttl, 4500);
        assert_eq!(parsed.answers[0].rdata.rtype(), rdata.rtype());
    }
}

#[test]
fn test_unknown_rdata_preserved_opaque() {
    let rdata = RData::Opaque {
        typ: 99,
        data: vec![1, 2, 3, 4],
    };
    let msg = Message {
        answers: vec![resource("alpha.local.", 60, rdata.clone())],
        ..Default::default()
    };
    let parsed = roundtrip(&msg);
    assert_eq!(parsed.answers[0].rdata, rdata);
}

#[test]
fn test_cache_flush_bit() {
    let mut record = resource("alpha.local.", 120, RData::A(Ipv4Addr::new(192, 0, 2, 1)));
    record.cache_flush = true;
    let msg = Message {
        answers: vec![record],
        ..Default::default()
    };
    let raw = msg.pack().unwrap();

    let parsed = roundtrip(&msg);
    assert!(parsed.answers[0].cache_flush);
    assert_eq!(parsed.answers[0].class, CLASS_INET);

    // The bit lives on the wire in the class field's top bit.
    // Header (12) + name (13) + type (2) = offset of the class field.
    let class_off = 12 + 13 + 2;
    assert_eq!(raw[class_off] & 0x80, 0x80);
}

#[test]
fn test_unicast_response_bit() {
    let msg = Message {
        questions: vec![Question {
            name: Name::new("alpha.local.").unwrap(),
            typ: DnsType::A,
            class: CLASS_INET,
            unicast_response: true,
        }],
        ..Default::default()
    };
    let parsed = roundtrip(&msg);
    assert!(parsed.questions[0].unicast_response);
    assert_eq!(parsed.questions[0].class, CLASS_INET);
}

#[test]
fn test_name_compression_shrinks_message() {
    let build = |compress: bool| {
        let msg = Message {
            answers: vec![
                resource(
                    "_printer._tcp.local.",
                    4500,
                    RData::Ptr(Name::new("lp1._printer._tcp.local.").unwrap()),
                ),
                resource(
                    "lp1._printer._tcp.local.",
                    4500,
                    RData::Txt(vec![b"paper=A4".to_vec()]),
                ),
            ],
            ..Default::default()
        };
        if compress {
            msg.pack().unwrap()
        } else {
            // Pack each record with compression disabled.
            let (_, bits) = msg.header.pack();
            let h = HeaderInternal {
                id: 0,
                bits,
                answers: 2,
                ..Default::default()
            };
            let mut raw = h.pack(vec![]);
            for r in &msg.answers {
                raw = r.pack(raw, &mut None, 0).unwrap();
            }
            raw
        }
    };

    let compressed = build(true);
    let uncompressed = build(false);
    assert!(compressed.len() < uncompressed.len());

    // Both forms parse to the same records.
    let mut a = Message::default();
    a.unpack(&compressed).unwrap();
    let mut b = Message::default();
    b.unpack(&uncompressed).unwrap();
    assert_eq!(a.answers, b.answers);
}

#[test]
fn test_name_pointer_loop_rejected() {
    // A name that points at itself.
    let raw = [0xC0u8, 0x00];
    let mut name = Name::default();
    assert_eq!(name.unpack(&raw, 0), Err(Error::ErrTooManyPtr));
}

#[test]
fn test_name_reserved_prefix_rejected() {
    let raw = [0x80u8, 0x00];
    let mut name = Name::default();
    assert_eq!(name.unpack(&raw, 0), Err(Error::ErrReserved));
}

#[test]
fn test_name_too_long() {
    let label = "a".repeat(63);
    let long = format!("{label}.{label}.{label}.{label}.{label}.");
    assert_eq!(Name::new(&long), Err(Error::ErrNameTooLong));
}

#[test]
fn test_empty_txt_packs_single_empty_string() {
    let msg = Message {
        answers: vec![resource("alpha.local.", 120, RData::Txt(vec![]))],
        ..Default::default()
    };
    let parsed = roundtrip(&msg);
    assert_eq!(parsed.answers[0].rdata, RData::Txt(vec![vec![]]));
}

#[test]
fn test_nsec_bad_bitmap_rejected() {
    // Window 0 with an illegal block length of 0.
    let bad = Resource {
        name: Name::new("alpha.local.").unwrap(),
        class: CLASS_INET,
        cache_flush: false,
        ttl: 120,
        rdata: RData::Nsec {
            next_domain: Name::new("alpha.local.").unwrap(),
            type_bitmap: vec![0, 0],
        },
    };
    let packed = bad.pack(vec![], &mut None, 0).unwrap();
    let mut parsed = Resource::default();
    assert_eq!(parsed.unpack(&packed, 0), Err(Error::ErrNsecBitmap));
}

#[test]
fn test_truncated_packet_rejected() {
    let msg = Message {
        answers: vec![resource("alpha.local.", 120, RData::A(Ipv4Addr::new(192, 0, 2, 1)))],
        ..Default::default()
    };
    let raw = msg.pack().unwrap();
    let mut parsed = Message::default();
    assert!(parsed.unpack(&raw[..raw.len() - 2]).is_err());
}
