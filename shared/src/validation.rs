//! Validation primitives and the rejection taxonomy
//!
//! Every check here is total: it returns a [`ValidationOutcome`] and never
//! panics. The first failing check is reported verbatim by the caller.

use crate::{
    elapsed_secs, LocomotionState, MoveReport, PlayerMovementRecord, Vec3,
    GROUNDED_MAX_VERTICAL_SPEED, MAX_FALL_OBSERVED_SPEED, MAX_FUTURE_OFFSET_MICROS,
    MAX_GROUND_HEIGHT, MAX_IDLE_SPEED, MAX_JUMP_OBSERVED_SPEED, MAX_PAST_OFFSET_MICROS,
    MAX_RUN_SPEED, MAX_TELEPORT_SPEED, MAX_TIME_DELTA_SECS, MAX_VELOCITY_MAGNITUDE,
    MAX_WALK_SPEED, MIN_TIME_DELTA_SECS, OBSERVED_SPEED_TOLERANCE,
};

pub type ValidationOutcome = Result<(), MoveRejection>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("timestamp {report} is too far in the future (server time {server_now})")]
    TooFarFuture { report: i64, server_now: i64 },

    #[error("timestamp {report} is too far in the past (server time {server_now})")]
    TooFarPast { report: i64, server_now: i64 },

    #[error("timestamp {report} is not after last accepted timestamp {last}")]
    NonMonotonic { last: i64, report: i64 },
}

/// Coarse classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Timestamp,
    Transition,
    Sanity,
    EntryPhysics,
    ContinuationPhysics,
}

/// Why a move report was not accepted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MoveRejection {
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("invalid state transition: {from} -> {to}")]
    Transition {
        from: LocomotionState,
        to: LocomotionState,
    },

    #[error("implausible {state} report: {detail}")]
    Sanity {
        state: LocomotionState,
        detail: String,
    },

    #[error("cannot enter {state}: {detail}")]
    EntryPhysics {
        state: LocomotionState,
        detail: String,
    },

    #[error("invalid {state} movement: {detail}")]
    ContinuationPhysics {
        state: LocomotionState,
        detail: String,
    },
}

impl MoveRejection {
    pub fn sanity(state: LocomotionState, detail: impl Into<String>) -> Self {
        MoveRejection::Sanity {
            state,
            detail: detail.into(),
        }
    }

    pub fn entry(state: LocomotionState, detail: impl Into<String>) -> Self {
        MoveRejection::EntryPhysics {
            state,
            detail: detail.into(),
        }
    }

    pub fn continuation(state: LocomotionState, detail: impl Into<String>) -> Self {
        MoveRejection::ContinuationPhysics {
            state,
            detail: detail.into(),
        }
    }

    /// Duplicate or reordered delivery. Tolerated, never counted against the player.
    pub fn is_silent_drop(&self) -> bool {
        matches!(
            self,
            MoveRejection::Timestamp(TimestampError::NonMonotonic { .. })
        )
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            MoveRejection::Timestamp(_) => RejectionKind::Timestamp,
            MoveRejection::Transition { .. } => RejectionKind::Transition,
            MoveRejection::Sanity { .. } => RejectionKind::Sanity,
            MoveRejection::EntryPhysics { .. } => RejectionKind::EntryPhysics,
            MoveRejection::ContinuationPhysics { .. } => RejectionKind::ContinuationPhysics,
        }
    }
}

/// Magnitude of `v` projected onto the horizontal plane.
pub fn horizontal_speed(v: &Vec3) -> f32 {
    v.horizontal().magnitude()
}

/// Planar distance between two points, vertical component ignored.
pub fn horizontal_distance(a: &Vec3, b: &Vec3) -> f32 {
    a.horizontal().distance(&b.horizontal())
}

/// Checks a report timestamp against the clock skew bounds only.
///
/// Used on its own for first contact, where there is no previous timestamp.
pub fn validate_clock_skew(report_ts: i64, server_now_ts: i64) -> ValidationOutcome {
    if report_ts > server_now_ts.saturating_add(MAX_FUTURE_OFFSET_MICROS) {
        return Err(TimestampError::TooFarFuture {
            report: report_ts,
            server_now: server_now_ts,
        }
        .into());
    }

    if report_ts < server_now_ts.saturating_sub(MAX_PAST_OFFSET_MICROS) {
        return Err(TimestampError::TooFarPast {
            report: report_ts,
            server_now: server_now_ts,
        }
        .into());
    }

    Ok(())
}

/// Checks a report timestamp against clock skew bounds and the last accepted timestamp.
///
/// The skew bounds are checked first, so a duplicate that is also stale is
/// punished rather than silently dropped.
pub fn validate_timestamp(last_ts: i64, report_ts: i64, server_now_ts: i64) -> ValidationOutcome {
    validate_clock_skew(report_ts, server_now_ts)?;

    if report_ts <= last_ts {
        return Err(TimestampError::NonMonotonic {
            last: last_ts,
            report: report_ts,
        }
        .into());
    }

    Ok(())
}

/// Largest displacement rate a report in `state` may show, before tolerance.
fn max_observed_speed(state: LocomotionState) -> f32 {
    match state {
        LocomotionState::Idle => MAX_IDLE_SPEED,
        LocomotionState::Walk => MAX_WALK_SPEED,
        LocomotionState::Run => MAX_RUN_SPEED,
        LocomotionState::Jump => MAX_JUMP_OBSERVED_SPEED,
        LocomotionState::Fall => MAX_FALL_OBSERVED_SPEED,
    }
}

/// State-independent plausibility of a report against the last record.
///
/// Compares positions, not the velocity the client claims, so every state
/// is bound by how far the player actually moved. Checks in order:
/// 0. all reported components are finite
/// 1. time since the last record is within `MIN_TIME_DELTA_SECS..=MAX_TIME_DELTA_SECS`
/// 2. 3D displacement is under `MAX_TELEPORT_SPEED` for that time
/// 3. observed speed is under the state's cap times `OBSERVED_SPEED_TOLERANCE`
/// 4. reported velocity magnitude is under `MAX_VELOCITY_MAGNITUDE`
/// 5. grounded reports stay near the ground; vertical speed is capped unless landing
pub fn validate_sanity(
    state: LocomotionState,
    report: &MoveReport,
    last: &PlayerMovementRecord,
) -> ValidationOutcome {
    if !report.origin.is_finite() || !report.velocity.is_finite() || !report.yaw.is_finite() {
        return Err(MoveRejection::sanity(state, "non-finite position, velocity or yaw"));
    }

    let dt = elapsed_secs(last.timestamp, report.timestamp);
    if !(MIN_TIME_DELTA_SECS..=MAX_TIME_DELTA_SECS).contains(&dt) {
        return Err(MoveRejection::sanity(
            state,
            format!(
                "time delta {:.3}s outside {:.3}-{:.3}s",
                dt, MIN_TIME_DELTA_SECS, MAX_TIME_DELTA_SECS
            ),
        ));
    }

    let distance = last.origin.distance(&report.origin);
    let max_distance = MAX_TELEPORT_SPEED * dt;
    if distance > max_distance {
        return Err(MoveRejection::sanity(
            state,
            format!(
                "teleport: moved {:.2}m in {:.3}s (max {:.2}m)",
                distance, dt, max_distance
            ),
        ));
    }

    let speed = distance / dt;
    let max_speed = max_observed_speed(state);
    if speed > max_speed * OBSERVED_SPEED_TOLERANCE {
        return Err(MoveRejection::sanity(
            state,
            format!("moved at {:.2} m/s (max {:.2} m/s)", speed, max_speed),
        ));
    }

    let velocity = report.velocity.magnitude();
    if velocity > MAX_VELOCITY_MAGNITUDE {
        return Err(MoveRejection::sanity(
            state,
            format!(
                "velocity magnitude {:.2} m/s exceeds {:.2} m/s",
                velocity, MAX_VELOCITY_MAGNITUDE
            ),
        ));
    }

    if state.is_grounded() {
        if report.origin.y > MAX_GROUND_HEIGHT {
            return Err(MoveRejection::sanity(
                state,
                format!("grounded but y={:.2}", report.origin.y),
            ));
        }

        // Landing frames are held to the landing window instead.
        if last.state.is_grounded() && report.velocity.y.abs() > GROUNDED_MAX_VERTICAL_SPEED {
            return Err(MoveRejection::sanity(
                state,
                format!("grounded but vy={:.2}", report.velocity.y),
            ));
        }
    }

    Ok(())
}

/// Rejects motion that covers more ground than `max_speed` allows in the elapsed time.
///
/// Returns the violation detail; the caller decides which state and phase to
/// attribute it to.
pub fn validate_minimum_travel_time(
    last_origin: &Vec3,
    report_origin: &Vec3,
    last_ts: i64,
    report_ts: i64,
    max_speed: f32,
    tolerance_seconds: f32,
) -> Result<(), String> {
    let distance = horizontal_distance(last_origin, report_origin);
    let expected = distance / max_speed;
    let elapsed = elapsed_secs(last_ts, report_ts);

    if elapsed < expected - tolerance_seconds {
        return Err(format!(
            "moved {:.2}m in {:.3}s, needs at least {:.3}s at {:.2} m/s",
            distance, elapsed, expected, max_speed
        ));
    }

    Ok(())
}
