use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod validation;

pub use validation::{
    horizontal_distance, horizontal_speed, validate_clock_skew, validate_minimum_travel_time,
    validate_sanity, validate_timestamp, MoveRejection, RejectionKind, TimestampError,
    ValidationOutcome,
};

pub const GRAVITY: f32 = -9.81;
pub const JUMP_IMPULSE: f32 = 5.0;
pub const JUMP_IMPULSE_TOLERANCE: f32 = 3.0;
pub const JUMP_VELOCITY_TOLERANCE: f32 = 2.0;
pub const BALLISTIC_POSITION_TOLERANCE: f32 = 0.5;
pub const TERMINAL_VELOCITY: f32 = 25.0;
pub const FALL_ACCELERATION_TOLERANCE: f32 = 0.5;
pub const FALL_MIN_LEAVE_HEIGHT: f32 = 0.1;

pub const MAX_IDLE_SPEED: f32 = 2.0;
pub const MAX_WALK_SPEED: f32 = 6.0;
pub const MAX_RUN_SPEED: f32 = 12.0;
pub const MAX_AIRBORNE_HORIZONTAL_SPEED: f32 = 8.0;
pub const JUMP_HORIZONTAL_CARRY_OVER: f32 = 1.0;
pub const AIR_CONTROL_ACCELERATION: f32 = 1.5;

pub const MAX_GROUND_HEIGHT: f32 = 0.5;
pub const LANDING_MAX_HEIGHT: f32 = 0.2;
pub const LANDING_MAX_VERTICAL_SPEED: f32 = 1.0;

pub const MIN_TIME_DELTA_SECS: f32 = 0.001;
pub const MAX_TIME_DELTA_SECS: f32 = 1.0;
pub const MAX_TELEPORT_SPEED: f32 = 50.0;
pub const MAX_VELOCITY_MAGNITUDE: f32 = 50.0;
pub const MAX_JUMP_OBSERVED_SPEED: f32 = 15.0;
pub const MAX_FALL_OBSERVED_SPEED: f32 = 30.0;
pub const OBSERVED_SPEED_TOLERANCE: f32 = 1.2;
pub const GROUNDED_MAX_VERTICAL_SPEED: f32 = 0.5;

pub const TRAVEL_TIME_TOLERANCE_SECS: f32 = 0.1;
pub const MAX_FUTURE_OFFSET_MICROS: i64 = 1_000_000;
pub const MAX_PAST_OFFSET_MICROS: i64 = 5_000_000;
pub const MICROS_PER_SECOND: f32 = 1_000_000.0;

pub type PlayerId = u32;

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_micros();
    micros.min(i64::MAX as u128) as i64
}

/// Seconds between two microsecond timestamps. Total over all `i64` inputs.
pub fn elapsed_secs(from: i64, to: i64) -> f32 {
    ((to as i128 - from as i128) as f64 / MICROS_PER_SECOND as f64) as f32
}

/// Position or velocity in world space. `y` is up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the vector with its vertical component zeroed.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn horizontal(&self) -> Vec3 {
        Vec3 {
            x: self.x,
            y: 0.0,
            z: self.z,
        }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude()
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// The movement mode a client claims to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocomotionState {
    #[default]
    Idle,
    Walk,
    Run,
    Jump,
    Fall,
}

impl LocomotionState {
    pub const ALL: [LocomotionState; 5] = [
        LocomotionState::Idle,
        LocomotionState::Walk,
        LocomotionState::Run,
        LocomotionState::Jump,
        LocomotionState::Fall,
    ];

    pub fn is_grounded(&self) -> bool {
        matches!(
            self,
            LocomotionState::Idle | LocomotionState::Walk | LocomotionState::Run
        )
    }

    pub fn is_airborne(&self) -> bool {
        matches!(self, LocomotionState::Jump | LocomotionState::Fall)
    }
}

impl fmt::Display for LocomotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocomotionState::Idle => "Idle",
            LocomotionState::Walk => "Walk",
            LocomotionState::Run => "Run",
            LocomotionState::Jump => "Jump",
            LocomotionState::Fall => "Fall",
        };
        f.write_str(name)
    }
}

/// A client's report of its own movement. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveReport {
    pub origin: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    /// Microseconds since the Unix epoch, client clock.
    pub timestamp: i64,
    /// Advisory only, the server measures time from timestamps.
    pub duration: f32,
}

/// The server's authoritative movement state for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMovementRecord {
    pub player: PlayerId,
    pub state: LocomotionState,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub timestamp: i64,
    pub last_valid_origin: Vec3,
    pub suspicious_activity_count: u32,
}

impl PlayerMovementRecord {
    /// Seeds a record from the first report seen for a player.
    pub fn first_contact(player: PlayerId, state: LocomotionState, report: &MoveReport) -> Self {
        Self {
            player,
            state,
            origin: report.origin,
            velocity: report.velocity,
            yaw: report.yaw,
            timestamp: report.timestamp,
            last_valid_origin: report.origin,
            suspicious_activity_count: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    MoveUpdate {
        state: LocomotionState,
        report: MoveReport,
    },
    Disconnect,

    Connected {
        player_id: PlayerId,
    },
    MoveAccepted {
        timestamp: i64,
    },
    /// Sent after a punished rejection; the client must snap to this state.
    Correction {
        state: LocomotionState,
        origin: Vec3,
        yaw: f32,
        timestamp: i64,
    },
    Disconnected {
        reason: String,
    },
}
