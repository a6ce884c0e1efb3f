//! Performance benchmarks for the validation hot path

use bincode::{deserialize, serialize};
use server::authority::{InMemoryStore, LogObserver, MovementAuthority};
use server::validator::MoveValidator;
use shared::{LocomotionState, MoveReport, Packet, PlayerMovementRecord, Vec3};
use std::time::Instant;

fn walk_record() -> PlayerMovementRecord {
    PlayerMovementRecord {
        player: 1,
        state: LocomotionState::Idle,
        origin: Vec3::ZERO,
        velocity: Vec3::ZERO,
        yaw: 0.0,
        timestamp: 1_000_000,
        last_valid_origin: Vec3::ZERO,
        suspicious_activity_count: 0,
    }
}

/// Benchmarks a full validation pass for a state change
#[test]
fn benchmark_validate_state_change() {
    let validator = MoveValidator::default();
    let last = walk_record();
    let walk = MoveReport {
        origin: Vec3::new(0.5, 0.0, 0.0),
        velocity: Vec3::new(2.5, 0.0, 0.0),
        yaw: 0.0,
        timestamp: 1_200_000,
        duration: 0.2,
    };

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = validator.validate(LocomotionState::Walk, &walk, &last, 1_200_000);
    }

    let duration = start.elapsed();
    println!(
        "Move validation: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second for 100k iterations
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks submitting moves for many players through the authority
#[test]
fn benchmark_submit_move_many_players() {
    let mut authority =
        MovementAuthority::new(InMemoryStore::new(), LogObserver, MoveValidator::default());

    let players = 1_000;
    let ticks = 20;
    let start = Instant::now();

    for tick in 0..ticks {
        let timestamp = 1_000_000 + tick as i64 * 100_000;
        for player in 0..players {
            let report = MoveReport {
                origin: Vec3::new(tick as f32 * 0.25, 0.0, player as f32),
                velocity: Vec3::new(2.5, 0.0, 0.0),
                yaw: 0.0,
                timestamp,
                duration: 0.1,
            };
            authority.submit_move(player, LocomotionState::Walk, report, timestamp);
        }
    }

    let duration = start.elapsed();
    let total = players as u128 * ticks as u128;
    println!(
        "Submit move: {} reports in {:?} ({:.2} μs/report)",
        total,
        duration,
        duration.as_micros() as f64 / total as f64
    );

    assert_eq!(authority.store().len(), players as usize);
    // Should complete in under 1 second for 20k reports
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks packet serialization performance
#[test]
fn benchmark_packet_serialization() {
    let packet = Packet::MoveUpdate {
        state: LocomotionState::Run,
        report: MoveReport {
            origin: Vec3::new(12.0, 0.0, -4.0),
            velocity: Vec3::new(10.0, 0.0, 0.0),
            yaw: 1.2,
            timestamp: 1_000_000,
            duration: 0.1,
        },
    };

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let data = serialize(&packet).unwrap();
        let _: Packet = deserialize(&data).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Packet round trip: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second for 100k iterations
    assert!(duration.as_millis() < 1000);
}
