//! # Movement Authority Server Library
//!
//! This library provides the server side of movement validation for a networked
//! game. Clients simulate their own character and report where they ended up;
//! the server decides whether that report is physically plausible and either
//! accepts it, silently drops it, or corrects the client back to the last
//! authoritative position.
//!
//! ## Core Responsibilities
//!
//! ### Locomotion Rules
//! Every report carries one of five locomotion states (idle, walk, run, jump,
//! fall). Each state knows whether it may be entered from the previous state
//! and whether a report is a plausible continuation of the previous one.
//!
//! ### Acceptance Policy
//! Accepted reports become the new authoritative record. Stale or duplicate
//! reports are dropped without penalty. Anything else reverts the player to
//! their last valid origin and bumps a suspicious-activity counter, which
//! resets on the next accepted report.
//!
//! ### Session Handling
//! The UDP host assigns player ids on connect, routes move reports to the
//! authority, answers each one, and drops the player's record when they
//! disconnect or go silent.
//!
//! ## Module Organization
//!
//! ### Locomotion Module (`locomotion`)
//! Per-state entry and continuation rules:
//! - Transition table between locomotion states
//! - Ground speed caps and travel-time checks
//! - Jump impulse, ballistic arc and velocity decay
//! - Fall direction, acceleration and terminal velocity
//!
//! ### Validator Module (`validator`)
//! Runs the checks for one report in a fixed order and returns the first
//! failure. A lenient profile skips everything but the timestamp checks.
//!
//! ### Authority Module (`authority`)
//! Applies a validation outcome to the player's record:
//! - First-contact seeding and the heartbeat fast path
//! - Revert and suspicious-activity counting on rejection
//! - Storage and telemetry behind the `MovementStore` and `MoveObserver` traits
//!
//! ### Client Manager Module (`client_manager`)
//! Maps network addresses to player ids and detects timed-out clients.
//!
//! ### Network Module (`network`)
//! UDP socket handling, packet dispatch and replies.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//! use server::validator::ValidationProfile;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         max_clients: 32,
//!         client_timeout: Duration::from_secs(5),
//!         profile: ValidationProfile::Standard,
//!     };
//!     let mut server = Server::new("127.0.0.1:8080", config).await?;
//!
//!     // Runs until a Shutdown message arrives on `server.control()`.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The authority can also be driven directly, without any networking:
//!
//! ```rust
//! use server::authority::{InMemoryStore, LogObserver, MoveDecision, MovementAuthority};
//! use server::validator::MoveValidator;
//! use shared::{LocomotionState, MoveReport, Vec3};
//!
//! let mut authority = MovementAuthority::new(InMemoryStore::new(), LogObserver, MoveValidator::default());
//!
//! let start = MoveReport {
//!     origin: Vec3::ZERO,
//!     velocity: Vec3::ZERO,
//!     yaw: 0.0,
//!     timestamp: 1_000_000,
//!     duration: 0.2,
//! };
//! assert_eq!(
//!     authority.submit_move(1, LocomotionState::Idle, start, 1_000_000),
//!     MoveDecision::FirstContact
//! );
//!
//! let step = MoveReport {
//!     origin: Vec3::new(0.5, 0.0, 0.0),
//!     velocity: Vec3::new(2.5, 0.0, 0.0),
//!     timestamp: 1_200_000,
//!     ..start
//! };
//! assert!(authority.submit_move(1, LocomotionState::Walk, step, 1_200_000).is_accepted());
//! ```
//!
//! ## Concurrency
//!
//! The authority itself never locks. The host serializes all reports through
//! its single main loop, so reports from the same player are processed one
//! at a time in arrival order.

pub mod authority;
pub mod client_manager;
pub mod locomotion;
pub mod network;
pub mod validator;

pub use authority::{
    InMemoryStore, LogObserver, MoveDecision, MoveObservation, MoveObserver, MovementAuthority,
    MovementStore,
};
pub use locomotion::{is_transition_allowed, rules_for, StateRules};
pub use validator::{MoveValidator, ValidationProfile};
