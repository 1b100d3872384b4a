//! Performance benchmarks for the hot paths of request handling

use server::dispatcher::dispatch;
use server::Registry;
use shared::protocol::{leave_request, player_payload};
use shared::{step, Direction, JoinRequest, MoveRequest, Player, Position, WorldBounds};
use std::net::SocketAddr;
use std::time::Instant;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Benchmarks the movement rule
#[test]
fn benchmark_step() {
    let bounds = WorldBounds::default();
    let iterations = 1_000_000;
    let start = Instant::now();

    let mut position = Position::new(400, 300);
    for i in 0..iterations {
        position = step(position, Direction::ALL[i % 8], &bounds);
    }

    let duration = start.elapsed();
    println!(
        "Step: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(bounds.contains(position));
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks record encoding
#[test]
fn benchmark_record_encoding() {
    let player = Player::new(7, "benchmark");
    let iterations = 100_000;
    let start = Instant::now();

    let mut total = 0;
    for _ in 0..iterations {
        total += player_payload(&player).len();
    }

    let duration = start.elapsed();
    println!(
        "Record encoding: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(total, iterations * player.encoded_len());
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks join/leave churn, which exercises slot reuse
#[test]
fn benchmark_join_leave_churn() {
    let mut registry = Registry::new(100, WorldBounds::default());
    let join = JoinRequest::new("churn").encode();
    let leave = leave_request();

    // Half-fill the roster so broadcasts have recipients
    for port in 0..50 {
        dispatch(&mut registry, &join, addr(10_000 + port)).unwrap();
    }

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let endpoint = addr(20_000 + (i % 50) as u16);
        dispatch(&mut registry, &join, endpoint).unwrap();
        dispatch(&mut registry, &leave, endpoint).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Join/leave churn: {} cycles in {:?} ({:.2} μs/cycle)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Churn never grows the id space past the high-water mark
    assert_eq!(registry.len(), 50);
    assert!(registry.get(52).is_none());
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks move fan-out to a full roster
#[test]
fn benchmark_move_fan_out() {
    let mut registry = Registry::new(100, WorldBounds::default());
    let join = JoinRequest::new("mover").encode();
    for port in 0..100 {
        dispatch(&mut registry, &join, addr(30_000 + port)).unwrap();
    }

    let iterations = 1_000;
    let start = Instant::now();

    let mut queued = 0;
    for i in 0..iterations {
        let request = MoveRequest::new(Direction::ALL[i % 8]).encode();
        queued += dispatch(&mut registry, &request, addr(30_000)).unwrap().len();
    }

    let duration = start.elapsed();
    println!(
        "Move fan-out: {} moves in {:?} ({:.2} μs/move)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(queued, iterations * 100);
    assert!(duration.as_millis() < 5000);
}
