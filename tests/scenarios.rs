//! End-to-end scenarios and property checks for the scan/compare/session
//! surface, driven entirely against an in-process `FakePort` so none of
//! this needs a real macOS target or task-port entitlements.

use std::collections::HashSet;

use memscan::error::Error;
use memscan::region::{MemoryRegion, RegionMap};
use memscan::scanner::{ScanEngine, MAX_CANDIDATES};
use memscan::session::Session;
use memscan::testutil::FakePort;
use memscan::value::{CompareOp, ValueType};

fn rw_region(start: usize, size: usize) -> MemoryRegion {
    MemoryRegion {
        start,
        size,
        readable: true,
        writable: true,
        executable: false,
    }
}

fn mapped(port: &FakePort) -> RegionMap {
    let mut map = RegionMap::empty();
    map.refresh(port).unwrap();
    map
}

#[test]
fn s1_exact_int_scan() {
    let port = FakePort::new();
    port.add_region(rw_region(0x1000, 0x200));
    let a1 = 0x1000 + 0x10;
    let a2 = 0x1000 + 0x80;
    port.write(a1, &100i32.to_ne_bytes()).unwrap();
    port.write(a2, &100i32.to_ne_bytes()).unwrap();

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    let summary = engine
        .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "100")
        .unwrap();

    assert_eq!(summary.count, 2);
    let addrs: Vec<usize> = engine.results().iter().map(|c| c.address).collect();
    assert_eq!(addrs, vec![a1, a2]);
}

#[test]
fn s2_refinement() {
    let port = FakePort::new();
    port.add_region(rw_region(0x2000, 0x200));
    let a1 = 0x2000 + 0x10;
    let a2 = 0x2000 + 0x80;
    port.write(a1, &100i32.to_ne_bytes()).unwrap();
    port.write(a2, &100i32.to_ne_bytes()).unwrap();

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    engine
        .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "100")
        .unwrap();
    assert_eq!(engine.results().len(), 2);

    port.write(a1, &101i32.to_ne_bytes()).unwrap();
    let summary = engine
        .next_scan(&port, ValueType::Int, CompareOp::Eq, Some("101"))
        .unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(engine.results()[0].address, a1);
}

#[test]
fn s3_unchanged_filter() {
    let port = FakePort::new();
    port.add_region(rw_region(0x3000, 0x200));
    let a3 = 0x3000 + 0x10;
    let a4 = 0x3000 + 0x80;
    port.write(a3, &3.5f32.to_ne_bytes()).unwrap();
    port.write(a4, &3.5f32.to_ne_bytes()).unwrap();

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    engine
        .first_scan(&map, &port, ValueType::Float, CompareOp::Eq, "3.5")
        .unwrap();
    assert_eq!(engine.results().len(), 2);

    // tick: A4 drifts, A3 is frozen
    port.write(a4, &9.25f32.to_ne_bytes()).unwrap();
    let summary = engine
        .next_scan(&port, ValueType::Float, CompareOp::Unchanged, None)
        .unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(engine.results()[0].address, a3);
}

#[test]
fn s4_write_round_trip() {
    let port = FakePort::new();
    port.add_region(rw_region(0x1000, 0x100));
    memscan::address::write(&port, 0x1000, ValueType::Int, "999").unwrap();
    let rendered = memscan::address::read(&port, 0x1000, ValueType::Int, None).unwrap();
    assert_eq!(rendered, "999");
}

#[test]
fn s5_string_scan() {
    let port = FakePort::new();
    port.add_region(rw_region(0x4000, 0x100));
    let a5 = 0x4000 + 0x10;
    port.write(a5, b"HELLO").unwrap();

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    let summary = engine
        .first_scan(&map, &port, ValueType::String, CompareOp::Eq, "HELLO")
        .unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(engine.results()[0].address, a5);
    assert_eq!(engine.results()[0].bytes.len(), 5);
}

#[test]
fn s6_cap_truncation() {
    let port = FakePort::new();
    port.add_region(rw_region(0x5000, 20_000));
    // no writes: every byte in the region defaults to 0

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    let summary = engine
        .first_scan(&map, &port, ValueType::Byte, CompareOp::Eq, "0")
        .unwrap();

    assert_eq!(summary.count, MAX_CANDIDATES);
    assert!(summary.truncated);
}

#[test]
fn invariant_render_parse_round_trip_for_numeric_types() {
    for (ty, literal) in [
        (ValueType::Byte, "7"),
        (ValueType::Short, "-1200"),
        (ValueType::Int, "-123456"),
        (ValueType::Long, "123456789012"),
        (ValueType::Float, "3.5"),
        (ValueType::Double, "2.718281828"),
    ] {
        let bytes = ty.parse(literal).unwrap();
        let rendered = ty.render(&bytes);
        let reparsed = ty.parse(&rendered).unwrap();
        assert_eq!(bytes, reparsed, "{ty:?} round-trip mismatch via {rendered}");
    }
}

#[test]
fn invariant_eq_compare_matches_canonical_equality() {
    let a = ValueType::Int.parse("42").unwrap();
    let b = ValueType::Int.parse("42").unwrap();
    let c = ValueType::Int.parse("43").unwrap();
    assert!(ValueType::Int.compare(&a, &b, CompareOp::Eq).unwrap());
    assert!(!ValueType::Int.compare(&a, &c, CompareOp::Eq).unwrap());
}

#[test]
fn invariant_first_scan_results_all_satisfy_the_predicate() {
    let port = FakePort::new();
    port.add_region(rw_region(0x6000, 0x100));
    port.write(0x6000 + 8, &100i32.to_ne_bytes()).unwrap();
    port.write(0x6000 + 40, &100i32.to_ne_bytes()).unwrap();
    port.write(0x6000 + 60, &7i32.to_ne_bytes()).unwrap();

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    engine
        .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "100")
        .unwrap();

    for c in engine.results() {
        assert_eq!(ValueType::Int.render(&c.bytes), "100");
    }
}

#[test]
fn invariant_next_scan_results_are_a_subset_of_previous() {
    let port = FakePort::new();
    port.add_region(rw_region(0x7000, 0x200));
    let addrs = [0x7000 + 0x10, 0x7000 + 0x40, 0x7000 + 0x80];
    for a in addrs {
        port.write(a, &55i32.to_ne_bytes()).unwrap();
    }

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    engine
        .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "55")
        .unwrap();
    let previous: HashSet<usize> = engine.results().iter().map(|c| c.address).collect();

    port.write(addrs[1], &56i32.to_ne_bytes()).unwrap();
    engine
        .next_scan(&port, ValueType::Int, CompareOp::Unchanged, None)
        .unwrap();
    let current: HashSet<usize> = engine.results().iter().map(|c| c.address).collect();

    assert!(current.is_subset(&previous));
    assert!(!current.is_empty());
}

#[test]
fn invariant_unchanged_is_stable_and_changed_is_empty_against_a_frozen_target() {
    let port = FakePort::new();
    port.add_region(rw_region(0x8000, 0x100));
    port.write(0x8000 + 0x10, &12i32.to_ne_bytes()).unwrap();

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    engine
        .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "12")
        .unwrap();

    let first = engine
        .next_scan(&port, ValueType::Int, CompareOp::Unchanged, None)
        .unwrap();
    let second = engine
        .next_scan(&port, ValueType::Int, CompareOp::Unchanged, None)
        .unwrap();
    assert_eq!(first.count, second.count);
    assert_eq!(engine.results().len(), 1);

    let changed = engine
        .next_scan(&port, ValueType::Int, CompareOp::Changed, None)
        .unwrap();
    assert_eq!(changed.count, 0);
}

#[test]
fn invariant_scan_cap_is_ten_thousand() {
    let port = FakePort::new();
    port.add_region(rw_region(0x9000, 15_000));

    let map = mapped(&port);
    let mut engine = ScanEngine::new();
    let summary = engine
        .first_scan(&map, &port, ValueType::Byte, CompareOp::Eq, "0")
        .unwrap();

    assert!(engine.results().len() <= MAX_CANDIDATES);
    assert_eq!(summary.count, MAX_CANDIDATES);
}

#[test]
fn invariant_detach_then_attached_only_command_yields_not_attached() {
    let mut session = Session::new();
    session
        .attach_with_port(1, "proc".into(), Box::new(FakePort::new()))
        .unwrap();
    session.detach().unwrap();

    let err = session
        .read_value(0x1000, ValueType::Int, None)
        .unwrap_err();
    assert!(matches!(err, Error::NotAttached));
    assert!(!session.is_attached());
}
