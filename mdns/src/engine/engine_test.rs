use std::cell::RefCell;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use sansio::Protocol;
use shared::error::Error;
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};

use crate::message::name::Name;
use crate::message::question::Question;
use crate::message::resource::{RData, Resource};
use crate::message::{CLASS_INET, DnsType, Message};

use super::agent::ResourceSection;
use super::*;

const LOCAL_V4: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
const PEER: &str = "192.0.2.5:5353";

fn started_engine(host: &str) -> Mdns {
    let config = MdnsConfig::new().with_local_ip(IpAddr::V4(LOCAL_V4));
    let mut engine = Mdns::new(config);
    engine.start(host).unwrap();
    engine
}

fn tagged(message: &Message, now: Instant) -> TaggedBytesMut {
    let raw = message.pack().unwrap();
    TaggedBytesMut {
        now,
        transport: TransportContext {
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), MDNS_PORT),
            peer_addr: PEER.parse().unwrap(),
            transport_protocol: TransportProtocol::UDP,
            ecn: None,
        },
        message: BytesMut::from(&raw[..]),
    }
}

fn parse(packet: &TaggedBytesMut) -> Message {
    let mut message = Message::default();
    message.unpack(&packet.message).unwrap();
    message
}

fn question(name: &str, typ: DnsType) -> Question {
    Question {
        name: Name::new(name).unwrap(),
        typ,
        class: CLASS_INET,
        unicast_response: false,
    }
}

fn record(name: &str, ttl: u32, rdata: RData) -> Resource {
    Resource {
        name: Name::new(name).unwrap(),
        class: CLASS_INET,
        cache_flush: false,
        ttl,
        rdata,
    }
}

// One full printer announcement from a remote peer.
fn printer_announcement(ttl: u32) -> Message {
    Message {
        header: crate::message::header::Header {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers: vec![
            record(
                "_printer._tcp.local.",
                ttl,
                RData::Ptr(Name::new("lp1._printer._tcp.local.").unwrap()),
            ),
            record(
                "lp1._printer._tcp.local.",
                ttl,
                RData::Srv {
                    priority: 0,
                    weight: 0,
                    port: 9100,
                    target: Name::new("beta.local.").unwrap(),
                },
            ),
            record(
                "lp1._printer._tcp.local.",
                ttl,
                RData::Txt(vec![b"paper=A4".to_vec()]),
            ),
        ],
        additionals: vec![record(
            "beta.local.",
            ttl,
            RData::A(Ipv4Addr::new(192, 0, 2, 7)),
        )],
        ..Default::default()
    }
}

#[test]
fn test_local_address_query() {
    let mut engine = started_engine("alpha");
    assert!(engine.poll_write().is_none());

    let now = Instant::now();
    let query = Message {
        questions: vec![question("alpha.local.", DnsType::A)],
        ..Default::default()
    };
    engine.handle_read(tagged(&query, now)).unwrap();

    let packet = engine.poll_write().expect("address answer");
    assert_eq!(packet.transport.peer_addr, MDNS_DEST_ADDR);

    let response = parse(&packet);
    assert!(response.header.response);
    assert!(response.header.authoritative);
    assert_eq!(response.answers.len(), 1);
    assert_eq!(response.answers[0].name.data, "alpha.local.");
    assert_eq!(response.answers[0].rdata, RData::A(LOCAL_V4));
    assert!(response.answers[0].cache_flush);

    assert!(engine.poll_write().is_none());
}

#[test]
fn test_address_query_for_other_host_ignored() {
    let mut engine = started_engine("alpha");

    let query = Message {
        questions: vec![question("gamma.local.", DnsType::A)],
        ..Default::default()
    };
    engine.handle_read(tagged(&query, Instant::now())).unwrap();
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_resolve_host_name_sends_both_questions() {
    let mut engine = started_engine("alpha");
    let deadline = Instant::now() + Duration::from_secs(2);
    engine.resolve_host_name("beta", deadline).unwrap();

    let packet = engine.poll_write().expect("questions packet");
    let message = parse(&packet);
    assert!(!message.header.response);
    assert_eq!(message.questions.len(), 2);
    for q in &message.questions {
        assert_eq!(q.name.data, "beta.local.");
    }
    let types: Vec<DnsType> = message.questions.iter().map(|q| q.typ).collect();
    assert!(types.contains(&DnsType::A));
    assert!(types.contains(&DnsType::Aaaa));

    // The deadline wake is armed.
    let timeout = engine.poll_timeout().expect("armed timer");
    assert!(timeout <= deadline);
}

#[test]
fn test_resolve_host_name_timeout_not_found() {
    let mut engine = started_engine("alpha");
    let start = Instant::now();
    let deadline = start + Duration::from_secs(2);
    engine.resolve_host_name("beta", deadline).unwrap();
    while engine.poll_write().is_some() {}

    // Nothing happens before the deadline.
    engine.handle_timeout(start + Duration::from_secs(1)).unwrap();
    assert!(engine.poll_event().is_none());

    engine
        .handle_timeout(deadline + Duration::from_millis(100))
        .unwrap();
    assert_eq!(
        engine.poll_event(),
        Some(MdnsEvent::HostNameResolved {
            host_name: "beta".to_owned(),
            address: None,
        })
    );
    assert!(engine.poll_event().is_none());
    assert!(!engine.agents.contains_key("beta.local."));

    // A later fire must not produce a second callback.
    engine
        .handle_timeout(deadline + Duration::from_secs(5))
        .unwrap();
    assert!(engine.poll_event().is_none());
}

#[test]
fn test_resolve_host_name_answered() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();
    engine
        .resolve_host_name("beta", now + Duration::from_secs(2))
        .unwrap();
    while engine.poll_write().is_some() {}

    let answer = Message {
        header: crate::message::header::Header {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers: vec![
            record("beta.local.", 120, RData::A(Ipv4Addr::new(192, 0, 2, 7))),
            record("beta.local.", 120, RData::Aaaa(Ipv6Addr::LOCALHOST)),
        ],
        ..Default::default()
    };
    engine.handle_read(tagged(&answer, now)).unwrap();

    assert_eq!(
        engine.poll_event(),
        Some(MdnsEvent::HostNameResolved {
            host_name: "beta".to_owned(),
            address: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))),
        })
    );
    assert!(engine.poll_event().is_none());
    assert!(!engine.agents.contains_key("beta.local."));
}

#[test]
fn test_resolve_single_family_reported_at_deadline() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();
    let deadline = now + Duration::from_secs(2);
    engine.resolve_host_name("beta", deadline).unwrap();
    while engine.poll_write().is_some() {}

    let answer = Message {
        header: crate::message::header::Header {
            response: true,
            ..Default::default()
        },
        answers: vec![record(
            "beta.local.",
            120,
            RData::A(Ipv4Addr::new(192, 0, 2, 7)),
        )],
        ..Default::default()
    };
    engine.handle_read(tagged(&answer, now)).unwrap();

    // Only one family answered; the result is held until the deadline.
    assert!(engine.poll_event().is_none());

    engine
        .handle_timeout(deadline + Duration::from_millis(10))
        .unwrap();
    assert_eq!(
        engine.poll_event(),
        Some(MdnsEvent::HostNameResolved {
            host_name: "beta".to_owned(),
            address: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))),
        })
    );
}

#[test]
fn test_publish_announces_twice() {
    let mut engine = started_engine("alpha");
    let start = Instant::now();
    engine
        .publish_service_instance("_printer._tcp", "lp1", 9100, vec!["paper=A4".to_owned()])
        .unwrap();

    let packet = engine.poll_write().expect("first announcement");
    let first = parse(&packet);
    assert!(first.header.response);
    assert!(first.header.authoritative);

    let answer_types: Vec<DnsType> = first.answers.iter().map(|r| r.rdata.rtype()).collect();
    assert!(answer_types.contains(&DnsType::Ptr));
    assert!(answer_types.contains(&DnsType::Srv));
    assert!(answer_types.contains(&DnsType::Txt));

    let ptr = first
        .answers
        .iter()
        .find(|r| r.rdata.rtype() == DnsType::Ptr)
        .unwrap();
    assert_eq!(ptr.name.data, "_printer._tcp.local.");
    assert_eq!(
        ptr.rdata,
        RData::Ptr(Name::new("lp1._printer._tcp.local.").unwrap())
    );

    let srv = first
        .answers
        .iter()
        .find(|r| r.rdata.rtype() == DnsType::Srv)
        .unwrap();
    assert_eq!(srv.name.data, "lp1._printer._tcp.local.");
    assert_eq!(
        srv.rdata,
        RData::Srv {
            priority: 0,
            weight: 0,
            port: 9100,
            target: Name::new("alpha.local.").unwrap(),
        }
    );

    // The placeholder expanded into the configured address, in additionals.
    assert_eq!(first.additionals.len(), 1);
    assert_eq!(first.additionals[0].rdata, RData::A(LOCAL_V4));

    assert!(engine.poll_write().is_none());

    // Second announcement about a second later.
    let timeout = engine.poll_timeout().expect("armed for second announcement");
    assert!(timeout <= start + Duration::from_millis(1100));

    engine
        .handle_timeout(start + Duration::from_millis(1100))
        .unwrap();
    let packet = engine.poll_write().expect("second announcement");
    let second = parse(&packet);
    assert_eq!(second.answers.len(), first.answers.len());

    // And nothing further.
    engine
        .handle_timeout(start + Duration::from_secs(10))
        .unwrap();
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_publish_defends_against_service_question() {
    let mut engine = started_engine("alpha");
    engine
        .publish_service_instance("_printer._tcp", "lp1", 9100, vec![])
        .unwrap();
    while engine.poll_write().is_some() {}

    let query = Message {
        questions: vec![question("_printer._tcp.local.", DnsType::Ptr)],
        ..Default::default()
    };
    engine.handle_read(tagged(&query, Instant::now())).unwrap();

    let packet = engine.poll_write().expect("defense");
    let response = parse(&packet);
    assert!(response.header.response);
    let types: Vec<DnsType> = response.answers.iter().map(|r| r.rdata.rtype()).collect();
    assert!(types.contains(&DnsType::Ptr));
    assert!(types.contains(&DnsType::Srv));
    assert!(types.contains(&DnsType::Txt));
}

#[test]
fn test_unpublish_sends_goodbye_once() {
    let mut engine = started_engine("alpha");
    let start = Instant::now();
    engine
        .publish_service_instance("_printer._tcp", "lp1", 9100, vec![])
        .unwrap();
    // Let both announcements happen first.
    engine
        .handle_timeout(start + Duration::from_secs(2))
        .unwrap();
    while engine.poll_write().is_some() {}

    engine
        .unpublish_service_instance("_printer._tcp", "lp1")
        .unwrap();

    let packet = engine.poll_write().expect("goodbye");
    let goodbye = parse(&packet);
    assert_eq!(goodbye.answers.len(), 3);
    for r in &goodbye.answers {
        assert_eq!(r.ttl, 0, "goodbye record {r}");
    }

    assert!(!engine.agents.contains_key("lp1._printer._tcp.local."));

    // The goodbye records are tombstoned; nothing re-sends them.
    engine
        .handle_timeout(start + Duration::from_secs(10))
        .unwrap();
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_subscribe_discovers_instance() {
    let mut engine = started_engine("alpha");
    engine.subscribe_to_service("_printer._tcp").unwrap();

    let packet = engine.poll_write().expect("ptr question");
    let query = parse(&packet);
    assert_eq!(query.questions.len(), 1);
    assert_eq!(query.questions[0].name.data, "_printer._tcp.local.");
    assert_eq!(query.questions[0].typ, DnsType::Ptr);

    engine
        .handle_read(tagged(&printer_announcement(4500), Instant::now()))
        .unwrap();

    let event = engine.poll_event().expect("discovery event");
    match event {
        MdnsEvent::ServiceInstance { change, instance } => {
            assert_eq!(change, InstanceChange::Discovered);
            assert_eq!(instance.service, "_printer._tcp");
            assert_eq!(instance.instance, "lp1");
            assert_eq!(instance.address, Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))));
            assert_eq!(instance.port, 9100);
            assert_eq!(instance.text, vec!["paper=A4".to_owned()]);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(engine.poll_event().is_none());

    // The same announcement again changes nothing.
    engine
        .handle_read(tagged(&printer_announcement(4500), Instant::now()))
        .unwrap();
    assert!(engine.poll_event().is_none());
}

#[test]
fn test_subscribe_goodbye_reports_lost() {
    let mut engine = started_engine("alpha");
    engine.subscribe_to_service("_printer._tcp").unwrap();
    while engine.poll_write().is_some() {}

    engine
        .handle_read(tagged(&printer_announcement(4500), Instant::now()))
        .unwrap();
    assert!(matches!(
        engine.poll_event(),
        Some(MdnsEvent::ServiceInstance {
            change: InstanceChange::Discovered,
            ..
        })
    ));

    // Goodbye: the PTR at TTL 0.
    let goodbye = Message {
        header: crate::message::header::Header {
            response: true,
            ..Default::default()
        },
        answers: vec![record(
            "_printer._tcp.local.",
            0,
            RData::Ptr(Name::new("lp1._printer._tcp.local.").unwrap()),
        )],
        ..Default::default()
    };
    engine.handle_read(tagged(&goodbye, Instant::now())).unwrap();

    match engine.poll_event() {
        Some(MdnsEvent::ServiceInstance { change, instance }) => {
            assert_eq!(change, InstanceChange::Lost);
            assert_eq!(instance.instance, "lp1");
        }
        other => panic!("expected loss, got {other:?}"),
    }
}

#[test]
fn test_subscription_requery_interval_doubles() {
    let mut engine = started_engine("alpha");
    let start = Instant::now();
    engine.subscribe_to_service("_printer._tcp").unwrap();
    while engine.poll_write().is_some() {}

    // Re-queries at ~1s, then ~2s after that.
    engine
        .handle_timeout(start + Duration::from_millis(1050))
        .unwrap();
    let packet = engine.poll_write().expect("first re-query");
    assert_eq!(parse(&packet).questions[0].typ, DnsType::Ptr);

    // Half a second later nothing is due.
    engine
        .handle_timeout(start + Duration::from_millis(1600))
        .unwrap();
    assert!(engine.poll_write().is_none());

    engine
        .handle_timeout(start + Duration::from_millis(3200))
        .unwrap();
    assert!(engine.poll_write().is_some());
}

#[test]
fn test_renewer_requeries_then_expires() {
    let mut engine = started_engine("alpha");
    let t0 = Instant::now();
    engine.subscribe_to_service("_printer._tcp").unwrap();
    while engine.poll_write().is_some() {}

    engine
        .handle_read(tagged(&printer_announcement(10), t0))
        .unwrap();
    assert!(matches!(
        engine.poll_event(),
        Some(MdnsEvent::ServiceInstance {
            change: InstanceChange::Discovered,
            ..
        })
    ));
    while engine.poll_write().is_some() {}

    // 80% of a 10 s TTL: a re-query for the tracked PTR goes out.
    engine
        .handle_timeout(t0 + Duration::from_millis(8050))
        .unwrap();
    let mut requery_seen = false;
    while let Some(packet) = engine.poll_write() {
        let message = parse(&packet);
        for q in &message.questions {
            if q.name.data == "_printer._tcp.local." && q.typ == DnsType::Ptr {
                requery_seen = true;
            }
        }
        // An expiration is never transmitted.
        assert!(message.answers.is_empty());
    }
    assert!(requery_seen, "no renewal re-query at 80% of TTL");

    // Further re-query points.
    for ms in [8550u64, 9050, 9550] {
        engine.handle_timeout(t0 + Duration::from_millis(ms)).unwrap();
        while engine.poll_write().is_some() {}
    }
    assert!(engine.poll_event().is_none());

    // No refresh arrived: at 100% the record expires and the instance is
    // reported lost. Nothing about it goes out on the wire.
    engine
        .handle_timeout(t0 + Duration::from_millis(10050))
        .unwrap();
    match engine.poll_event() {
        Some(MdnsEvent::ServiceInstance { change, instance }) => {
            assert_eq!(change, InstanceChange::Lost);
            assert_eq!(instance.instance, "lp1");
        }
        other => panic!("expected loss, got {other:?}"),
    }
    while let Some(packet) = engine.poll_write() {
        let message = parse(&packet);
        assert!(message.answers.is_empty());
        assert!(message.additionals.is_empty());
    }
}

#[test]
fn test_renewer_refresh_resets_schedule() {
    let mut engine = started_engine("alpha");
    let t0 = Instant::now();
    engine.subscribe_to_service("_printer._tcp").unwrap();
    while engine.poll_write().is_some() {}

    engine
        .handle_read(tagged(&printer_announcement(10), t0))
        .unwrap();
    engine.poll_event();
    while engine.poll_write().is_some() {}

    // A refresh at 9 s restarts the clock.
    engine
        .handle_read(tagged(
            &printer_announcement(10),
            t0 + Duration::from_secs(9),
        ))
        .unwrap();
    engine.poll_event();
    while engine.poll_write().is_some() {}

    // The original expiry point passes without a loss.
    engine
        .handle_timeout(t0 + Duration::from_millis(10500))
        .unwrap();
    assert!(engine.poll_event().is_none());
}

#[test]
fn test_duplicate_resource_sent_once() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();

    let shared = Rc::new(RefCell::new(record(
        "x.local.",
        120,
        RData::A(Ipv4Addr::new(192, 0, 2, 9)),
    )));

    // Two agents scheduling the same record instance at the same time.
    engine
        .core
        .send_resource(shared.clone(), ResourceSection::Answer, now);
    engine
        .core
        .send_resource(shared.clone(), ResourceSection::Answer, now);
    engine.send_message(now);

    let packet = engine.poll_write().expect("one message");
    let message = parse(&packet);
    assert_eq!(message.answers.len(), 1);
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_cancelled_record_not_sent() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();

    let shared = Rc::new(RefCell::new(record(
        "x.local.",
        120,
        RData::A(Ipv4Addr::new(192, 0, 2, 9)),
    )));
    engine
        .core
        .send_resource(shared.clone(), ResourceSection::Answer, now);

    // Cancelled while queued.
    shared.borrow_mut().ttl = u32::MAX;
    engine.send_message(now);
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_goodbye_record_tombstoned_after_send() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();

    let shared = Rc::new(RefCell::new(record(
        "x.local.",
        0,
        RData::A(Ipv4Addr::new(192, 0, 2, 9)),
    )));
    engine
        .core
        .send_resource(shared.clone(), ResourceSection::Answer, now);
    engine.send_message(now);

    let packet = engine.poll_write().expect("goodbye sent");
    assert_eq!(parse(&packet).answers[0].ttl, 0);
    assert_eq!(shared.borrow().ttl, u32::MAX);

    // Re-queueing it sends nothing.
    engine
        .core
        .send_resource(shared.clone(), ResourceSection::Answer, now);
    engine.send_message(now);
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_aggregation_window_lookahead() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();

    let soon = Rc::new(RefCell::new(record(
        "x.local.",
        120,
        RData::A(Ipv4Addr::new(192, 0, 2, 9)),
    )));
    let later = Rc::new(RefCell::new(record(
        "y.local.",
        120,
        RData::A(Ipv4Addr::new(192, 0, 2, 10)),
    )));

    // Due within the 100 ms window: rides along. Due later: waits.
    engine
        .core
        .send_resource(soon.clone(), ResourceSection::Answer, now + Duration::from_millis(50));
    engine
        .core
        .send_resource(later.clone(), ResourceSection::Answer, now + Duration::from_millis(500));
    engine.send_message(now);

    let packet = engine.poll_write().expect("window message");
    let message = parse(&packet);
    assert_eq!(message.answers.len(), 1);
    assert_eq!(message.answers[0].name.data, "x.local.");

    // The leftover is sent once its time comes.
    engine.post_task();
    let timeout = engine.poll_timeout().expect("armed for y.local.");
    engine.handle_timeout(timeout).unwrap();
    let packet = engine.poll_write().expect("second message");
    assert_eq!(parse(&packet).answers[0].name.data, "y.local.");
}

#[test]
fn test_single_timer_per_timestamp() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();
    let when = now + Duration::from_secs(1);

    engine.core.wake_at("a", when);
    engine.post_task();
    assert_eq!(engine.post_task_queue.len(), 1);

    // Same timestamp again, and a later one: both already covered.
    engine.core.wake_at("b", when);
    engine.post_task();
    engine.core.wake_at("c", when + Duration::from_secs(1));
    engine.post_task();
    assert_eq!(engine.post_task_queue.len(), 1);
    assert_eq!(engine.poll_timeout(), Some(when));

    // After the fire, the later wake gets its own timer.
    engine.handle_timeout(when).unwrap();
    assert_eq!(engine.post_task_queue.len(), 1);
    assert_eq!(engine.poll_timeout(), Some(when + Duration::from_secs(1)));
}

#[test]
fn test_wake_in_past_fires_immediately() {
    let mut engine = started_engine("alpha");
    let now = Instant::now();

    // A resolver whose deadline has already passed.
    engine
        .resolve_host_name("beta", now - Duration::from_millis(1))
        .unwrap();
    while engine.poll_write().is_some() {}

    let timeout = engine.poll_timeout().expect("armed timer");
    assert!(timeout <= now);
    engine.handle_timeout(now).unwrap();
    assert!(matches!(
        engine.poll_event(),
        Some(MdnsEvent::HostNameResolved { address: None, .. })
    ));
}

#[test]
fn test_empty_inbound_message() {
    let mut engine = started_engine("alpha");
    let empty = Message::default();
    engine.handle_read(tagged(&empty, Instant::now())).unwrap();
    assert!(engine.poll_write().is_none());
    assert!(engine.poll_event().is_none());
}

#[test]
fn test_malformed_packet_dropped() {
    let mut engine = started_engine("alpha");
    let msg = TaggedBytesMut {
        now: Instant::now(),
        transport: TransportContext::default(),
        message: BytesMut::from(&[0xFFu8, 0x00, 0x01][..]),
    };
    assert!(engine.handle_read(msg).is_ok());
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_invalid_names_rejected() {
    let mut engine = started_engine("alpha");
    assert!(matches!(
        engine.publish_service_instance("printer", "lp1", 9100, vec![]),
        Err(Error::ErrInvalidServiceName(_))
    ));
    assert!(matches!(
        engine.subscribe_to_service("_printer._sctp"),
        Err(Error::ErrInvalidServiceName(_))
    ));
    assert!(matches!(
        engine.resolve_host_name("a.b", Instant::now()),
        Err(Error::ErrInvalidHostName(_))
    ));
    assert!(matches!(
        engine.publish_service_instance("_printer._tcp", "lp.1", 9100, vec![]),
        Err(Error::ErrInvalidInstanceName(_))
    ));

    let mut unstarted = Mdns::new(MdnsConfig::new());
    assert_eq!(unstarted.start(""), Err(Error::ErrHostnameEmpty));
    assert_eq!(
        unstarted.publish_service_instance("_printer._tcp", "lp1", 9100, vec![]),
        Err(Error::ErrEngineNotStarted)
    );
}

#[test]
fn test_stop_keeps_queues_but_sends_nothing() {
    let mut engine = started_engine("alpha");
    let start = Instant::now();
    engine.subscribe_to_service("_printer._tcp").unwrap();
    while engine.poll_write().is_some() {}

    engine.stop();
    engine
        .handle_timeout(start + Duration::from_secs(2))
        .unwrap();
    assert!(engine.poll_write().is_none());
    assert!(!engine.core.question_queue.is_empty() || !engine.core.wake_queue.is_empty());
}

#[test]
fn test_close_rejects_further_traffic() {
    let mut engine = started_engine("alpha");
    engine.close().unwrap();

    let msg = TaggedBytesMut {
        now: Instant::now(),
        transport: TransportContext::default(),
        message: BytesMut::new(),
    };
    assert_eq!(engine.handle_read(msg), Err(Error::ErrConnectionClosed));
    assert_eq!(
        engine.handle_timeout(Instant::now()),
        Err(Error::ErrConnectionClosed)
    );
    assert!(engine.poll_timeout().is_none());
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_not_started_ignores_inbound() {
    let mut engine = Mdns::new(MdnsConfig::new());
    let query = Message {
        questions: vec![question("alpha.local.", DnsType::A)],
        ..Default::default()
    };
    engine.handle_read(tagged(&query, Instant::now())).unwrap();
    assert!(engine.poll_write().is_none());
}
