//! Acceptance and correction policy for client move reports
//!
//! [`MovementAuthority`] owns the decision of how a player's authoritative
//! [`PlayerMovementRecord`] changes in response to one report. Storage and
//! telemetry are collaborators behind [`MovementStore`] and [`MoveObserver`];
//! the host supplies the server clock on every call.
//!
//! The host must serialize reports from the same player. Nothing here locks.

use crate::validator::MoveValidator;
use log::{debug, warn};
use shared::{
    validate_clock_skew, validate_timestamp, LocomotionState, MoveRejection, MoveReport, PlayerId,
    PlayerMovementRecord, Vec3,
};
use std::collections::HashMap;

/// Keyed persistence for movement records.
pub trait MovementStore {
    fn get(&self, player: PlayerId) -> Option<PlayerMovementRecord>;
    fn put(&mut self, record: PlayerMovementRecord);
    /// Session teardown. Returns true if a record was removed.
    fn remove(&mut self, player: PlayerId) -> bool;
}

/// One decision reported to the telemetry sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveObservation {
    pub player: PlayerId,
    pub accepted: bool,
    pub reason: String,
    pub silent_drop: bool,
}

pub trait MoveObserver {
    fn observe(&mut self, observation: &MoveObservation);
}

/// What happened to a report.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveDecision {
    /// No prior record existed; the report seeded one.
    FirstContact,
    /// No prior record existed and the report's clock was out of bounds. Nothing was stored.
    Refused(MoveRejection),
    /// Same state and position as before; only timestamp and yaw were refreshed.
    Heartbeat,
    Accepted,
    /// Rejected without penalty. The record was not touched.
    Dropped(MoveRejection),
    /// Rejected and penalized. The record was reverted and now holds `suspicious_activity_count`.
    Corrected {
        rejection: MoveRejection,
        suspicious_activity_count: u32,
    },
}

impl MoveDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            MoveDecision::FirstContact | MoveDecision::Heartbeat | MoveDecision::Accepted
        )
    }
}

pub struct MovementAuthority<S, O> {
    store: S,
    observer: O,
    validator: MoveValidator,
}

impl<S: MovementStore, O: MoveObserver> MovementAuthority<S, O> {
    pub fn new(store: S, observer: O, validator: MoveValidator) -> Self {
        Self {
            store,
            observer,
            validator,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn record(&self, player: PlayerId) -> Option<PlayerMovementRecord> {
        self.store.get(player)
    }

    /// Drops a player's record when their session ends.
    pub fn end_session(&mut self, player: PlayerId) -> bool {
        self.store.remove(player)
    }

    /// Validates one report and applies the outcome to the player's record.
    pub fn submit_move(
        &mut self,
        player: PlayerId,
        state: LocomotionState,
        report: MoveReport,
        server_now: i64,
    ) -> MoveDecision {
        let Some(last) = self.store.get(player) else {
            return self.first_contact(player, state, &report, server_now);
        };

        if state == last.state && report.origin == last.origin {
            return self.heartbeat(last, &report, server_now);
        }

        match self.validator.validate(state, &report, &last, server_now) {
            Ok(()) => {
                self.store.put(PlayerMovementRecord {
                    player,
                    state,
                    origin: report.origin,
                    velocity: report.velocity,
                    yaw: report.yaw,
                    timestamp: report.timestamp,
                    last_valid_origin: report.origin,
                    suspicious_activity_count: 0,
                });
                self.emit(player, true, &format!("{} at {}", state, report.origin), false);
                MoveDecision::Accepted
            }
            Err(rejection) if rejection.is_silent_drop() => {
                self.emit(player, false, &rejection.to_string(), true);
                MoveDecision::Dropped(rejection)
            }
            Err(rejection) => self.correct(last, rejection, server_now),
        }
    }

    /// Seeds a record from the first report, provided its clock is in bounds.
    ///
    /// Later checks measure time from the seeded timestamp, so it must be
    /// within the same skew window as any other report.
    fn first_contact(
        &mut self,
        player: PlayerId,
        state: LocomotionState,
        report: &MoveReport,
        server_now: i64,
    ) -> MoveDecision {
        if let Err(rejection) = validate_clock_skew(report.timestamp, server_now) {
            self.emit(player, false, &rejection.to_string(), false);
            return MoveDecision::Refused(rejection);
        }

        self.store
            .put(PlayerMovementRecord::first_contact(player, state, report));
        self.emit(player, true, "first contact", false);
        MoveDecision::FirstContact
    }

    /// Refreshes timestamp and yaw for a report that did not move.
    ///
    /// Deliberately departs from the bounded clock skew rule that punishes
    /// moves: a too-far-future or too-far-past heartbeat is dropped without
    /// penalty, since there is no motion to revert.
    fn heartbeat(
        &mut self,
        mut last: PlayerMovementRecord,
        report: &MoveReport,
        server_now: i64,
    ) -> MoveDecision {
        if let Err(rejection) = validate_timestamp(last.timestamp, report.timestamp, server_now) {
            self.emit(last.player, false, &rejection.to_string(), true);
            return MoveDecision::Dropped(rejection);
        }

        last.timestamp = report.timestamp;
        last.yaw = report.yaw;
        last.velocity = Vec3::ZERO;
        let player = last.player;
        self.store.put(last);
        self.emit(player, true, "heartbeat", false);
        MoveDecision::Heartbeat
    }

    /// Reverts to the prior authoritative origin and state, and counts the offence.
    ///
    /// The record's timestamp moves to the server clock, never backwards, so
    /// the next report is measured from the correction and reports already
    /// in flight are dropped as stale.
    fn correct(
        &mut self,
        mut last: PlayerMovementRecord,
        rejection: MoveRejection,
        server_now: i64,
    ) -> MoveDecision {
        last.suspicious_activity_count = last.suspicious_activity_count.saturating_add(1);
        last.velocity = Vec3::ZERO;
        last.timestamp = last.timestamp.max(server_now);
        let player = last.player;
        let count = last.suspicious_activity_count;
        self.store.put(last);

        self.emit(player, false, &rejection.to_string(), false);
        MoveDecision::Corrected {
            rejection,
            suspicious_activity_count: count,
        }
    }

    fn emit(&mut self, player: PlayerId, accepted: bool, reason: &str, silent_drop: bool) {
        self.observer.observe(&MoveObservation {
            player,
            accepted,
            reason: reason.to_string(),
            silent_drop,
        });
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: HashMap<PlayerId, PlayerMovementRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MovementStore for InMemoryStore {
    fn get(&self, player: PlayerId) -> Option<PlayerMovementRecord> {
        self.records.get(&player).cloned()
    }

    fn put(&mut self, record: PlayerMovementRecord) {
        self.records.insert(record.player, record);
    }

    fn remove(&mut self, player: PlayerId) -> bool {
        self.records.remove(&player).is_some()
    }
}

/// Observer that writes every decision to the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl MoveObserver for LogObserver {
    fn observe(&mut self, observation: &MoveObservation) {
        if observation.accepted {
            debug!("Player {} move accepted {}", observation.player, observation.reason);
        } else if observation.silent_drop {
            debug!(
                "Player {} move dropped: {}",
                observation.player, observation.reason
            );
        } else {
            warn!(
                "Player {} failed validation: {}",
                observation.player, observation.reason
            );
        }
    }
}
