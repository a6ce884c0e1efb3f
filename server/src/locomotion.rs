//! Per-state movement rules
//!
//! Each locomotion state has one rule set deciding whether a report may
//! enter the state from the previous one, and whether motion inside the
//! state is physically consistent. The mapping from state to rules is a
//! `match` over the closed [`LocomotionState`] enum, so there is no
//! runtime registry to mutate and the compiler checks exhaustiveness.

use shared::{
    elapsed_secs, horizontal_speed, validate_minimum_travel_time, LocomotionState, MoveRejection,
    MoveReport, PlayerMovementRecord, ValidationOutcome, AIR_CONTROL_ACCELERATION,
    BALLISTIC_POSITION_TOLERANCE, FALL_ACCELERATION_TOLERANCE, FALL_MIN_LEAVE_HEIGHT, GRAVITY,
    JUMP_HORIZONTAL_CARRY_OVER, JUMP_IMPULSE, JUMP_IMPULSE_TOLERANCE, JUMP_VELOCITY_TOLERANCE,
    LANDING_MAX_HEIGHT, LANDING_MAX_VERTICAL_SPEED, MAX_AIRBORNE_HORIZONTAL_SPEED,
    MAX_GROUND_HEIGHT, MAX_IDLE_SPEED, MAX_RUN_SPEED, MAX_TIME_DELTA_SECS, MAX_WALK_SPEED,
    TERMINAL_VELOCITY, TRAVEL_TIME_TOLERANCE_SECS,
};

/// Entry and continuation rules for one locomotion state.
pub trait StateRules: Sync {
    fn state(&self) -> LocomotionState;

    /// Checks a transition into this state from `from`.
    ///
    /// Transition legality is checked before any physics, so an illegal
    /// pair is rejected whatever values the report carries.
    fn can_enter(
        &self,
        from: LocomotionState,
        report: &MoveReport,
        last: &PlayerMovementRecord,
    ) -> ValidationOutcome;

    /// Checks motion while in this state.
    fn continues_validly(&self, report: &MoveReport, last: &PlayerMovementRecord)
        -> ValidationOutcome;
}

pub struct Idle;
pub struct Walk;
pub struct Run;
pub struct Jump;
pub struct Fall;

/// Looks up the rule set for a state.
pub fn rules_for(state: LocomotionState) -> &'static dyn StateRules {
    match state {
        LocomotionState::Idle => &Idle,
        LocomotionState::Walk => &Walk,
        LocomotionState::Run => &Run,
        LocomotionState::Jump => &Jump,
        LocomotionState::Fall => &Fall,
    }
}

/// Whether `from -> to` appears in the transition table. Staying in a state is always legal.
///
/// `Fall -> Jump` is deliberately absent: a falling player cannot jump again.
pub fn is_transition_allowed(from: LocomotionState, to: LocomotionState) -> bool {
    use LocomotionState::*;

    if from == to {
        return true;
    }

    match (from, to) {
        (Idle | Walk | Run, Idle | Walk | Run) => true,
        (Idle | Walk | Run, Jump | Fall) => true,
        (Jump, Fall) => true,
        (Jump | Fall, Idle | Walk | Run) => true,
        _ => false,
    }
}

fn check_transition(from: LocomotionState, to: LocomotionState) -> ValidationOutcome {
    if is_transition_allowed(from, to) {
        Ok(())
    } else {
        Err(MoveRejection::Transition { from, to })
    }
}

fn check_landing(state: LocomotionState, report: &MoveReport) -> ValidationOutcome {
    if report.origin.y > LANDING_MAX_HEIGHT {
        return Err(MoveRejection::entry(
            state,
            format!(
                "landing but y={:.2} (max {:.2})",
                report.origin.y, LANDING_MAX_HEIGHT
            ),
        ));
    }

    if report.velocity.y.abs() > LANDING_MAX_VERTICAL_SPEED {
        return Err(MoveRejection::entry(
            state,
            format!(
                "landing but vy={:.2} (max {:.2})",
                report.velocity.y, LANDING_MAX_VERTICAL_SPEED
            ),
        ));
    }

    Ok(())
}

fn enter_grounded(
    state: LocomotionState,
    from: LocomotionState,
    report: &MoveReport,
) -> ValidationOutcome {
    check_transition(from, state)?;
    if from.is_airborne() {
        check_landing(state, report)?;
    }
    Ok(())
}

fn continue_grounded(state: LocomotionState, report: &MoveReport, max_speed: f32) -> ValidationOutcome {
    if report.origin.y > MAX_GROUND_HEIGHT {
        return Err(MoveRejection::continuation(
            state,
            format!(
                "grounded but y={:.2} (max {:.2})",
                report.origin.y, MAX_GROUND_HEIGHT
            ),
        ));
    }

    let speed = horizontal_speed(&report.velocity);
    if speed > max_speed {
        return Err(MoveRejection::continuation(
            state,
            format!("speed {:.2} m/s exceeds {:.2} m/s", speed, max_speed),
        ));
    }

    Ok(())
}

/// Take-off cannot add more than a small boost to the grounded horizontal speed.
fn check_take_off_carry_over(
    state: LocomotionState,
    report: &MoveReport,
    last: &PlayerMovementRecord,
) -> ValidationOutcome {
    let ground_speed = horizontal_speed(&last.velocity);
    let air_speed = horizontal_speed(&report.velocity);
    if air_speed > ground_speed + JUMP_HORIZONTAL_CARRY_OVER {
        return Err(MoveRejection::entry(
            state,
            format!(
                "gained {:.2} m/s horizontal speed on take-off (had {:.2} m/s, now {:.2} m/s)",
                air_speed - ground_speed,
                ground_speed,
                air_speed
            ),
        ));
    }
    Ok(())
}

fn continue_airborne_horizontal(
    state: LocomotionState,
    report: &MoveReport,
    last: &PlayerMovementRecord,
) -> ValidationOutcome {
    let speed = horizontal_speed(&report.velocity);
    if speed > MAX_AIRBORNE_HORIZONTAL_SPEED {
        return Err(MoveRejection::continuation(
            state,
            format!(
                "airborne horizontal speed {:.2} m/s exceeds {:.2} m/s",
                speed, MAX_AIRBORNE_HORIZONTAL_SPEED
            ),
        ));
    }

    if last.state.is_airborne() {
        let dt = elapsed_secs(last.timestamp, report.timestamp);
        let gained = speed - horizontal_speed(&last.velocity);
        let allowed = AIR_CONTROL_ACCELERATION * dt;
        if gained > allowed {
            return Err(MoveRejection::continuation(
                state,
                format!(
                    "gained {:.2} m/s horizontal speed in air (max {:.2} m/s over {:.3}s)",
                    gained, allowed, dt
                ),
            ));
        }
    }

    Ok(())
}

/// Height after `dt` seconds of projectile motion.
fn ballistic_height(start_y: f32, vertical_speed: f32, dt: f32) -> f32 {
    start_y + vertical_speed * dt + 0.5 * GRAVITY * dt * dt
}

fn check_ballistic_height(
    report: &MoveReport,
    start_y: f32,
    vertical_speed: f32,
    dt: f32,
    reject: fn(LocomotionState, String) -> MoveRejection,
) -> ValidationOutcome {
    let expected_y = ballistic_height(start_y, vertical_speed, dt);
    if (report.origin.y - expected_y).abs() > BALLISTIC_POSITION_TOLERANCE {
        return Err(reject(
            LocomotionState::Jump,
            format!(
                "height {:.2} does not match trajectory (expected {:.2})",
                report.origin.y, expected_y
            ),
        ));
    }
    Ok(())
}

impl StateRules for Idle {
    fn state(&self) -> LocomotionState {
        LocomotionState::Idle
    }

    fn can_enter(
        &self,
        from: LocomotionState,
        report: &MoveReport,
        _last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        enter_grounded(self.state(), from, report)
    }

    fn continues_validly(
        &self,
        report: &MoveReport,
        _last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        continue_grounded(self.state(), report, MAX_IDLE_SPEED)
    }
}

impl StateRules for Walk {
    fn state(&self) -> LocomotionState {
        LocomotionState::Walk
    }

    fn can_enter(
        &self,
        from: LocomotionState,
        report: &MoveReport,
        _last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        enter_grounded(self.state(), from, report)
    }

    fn continues_validly(
        &self,
        report: &MoveReport,
        _last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        continue_grounded(self.state(), report, MAX_WALK_SPEED)
    }
}

impl Run {
    fn travel_time(report: &MoveReport, last: &PlayerMovementRecord) -> Result<(), String> {
        validate_minimum_travel_time(
            &last.origin,
            &report.origin,
            last.timestamp,
            report.timestamp,
            MAX_RUN_SPEED,
            TRAVEL_TIME_TOLERANCE_SECS,
        )
    }
}

impl StateRules for Run {
    fn state(&self) -> LocomotionState {
        LocomotionState::Run
    }

    fn can_enter(
        &self,
        from: LocomotionState,
        report: &MoveReport,
        last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        check_transition(from, self.state())?;
        if from.is_airborne() {
            return check_landing(self.state(), report);
        }
        Run::travel_time(report, last).map_err(|detail| MoveRejection::entry(self.state(), detail))
    }

    fn continues_validly(
        &self,
        report: &MoveReport,
        last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        Run::travel_time(report, last)
            .map_err(|detail| MoveRejection::continuation(self.state(), detail))
    }
}

impl StateRules for Jump {
    fn state(&self) -> LocomotionState {
        LocomotionState::Jump
    }

    fn can_enter(
        &self,
        from: LocomotionState,
        report: &MoveReport,
        last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        check_transition(from, self.state())?;

        let vy = report.velocity.y;
        if vy < JUMP_IMPULSE - JUMP_IMPULSE_TOLERANCE || vy > JUMP_IMPULSE + JUMP_IMPULSE_TOLERANCE
        {
            return Err(MoveRejection::entry(
                self.state(),
                format!(
                    "take-off velocity {:.2} not near expected {:.2}",
                    vy, JUMP_IMPULSE
                ),
            ));
        }

        check_take_off_carry_over(self.state(), report, last)?;

        // The last grounded report can predate take-off by a long idle gap.
        let dt = elapsed_secs(last.timestamp, report.timestamp).min(MAX_TIME_DELTA_SECS);
        check_ballistic_height(report, last.origin.y, JUMP_IMPULSE, dt, |state, detail| {
            MoveRejection::entry(state, detail)
        })
    }

    fn continues_validly(
        &self,
        report: &MoveReport,
        last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        let vy = report.velocity.y;
        if vy <= 0.0 {
            return Err(MoveRejection::continuation(
                self.state(),
                format!("vertical velocity {:.2} is not upward (should be Fall)", vy),
            ));
        }

        continue_airborne_horizontal(self.state(), report, last)?;

        if last.state != LocomotionState::Jump {
            return Ok(());
        }

        if vy >= last.velocity.y {
            return Err(MoveRejection::continuation(
                self.state(),
                format!(
                    "vertical velocity {:.2} did not decrease from {:.2} under gravity",
                    vy, last.velocity.y
                ),
            ));
        }

        let dt = elapsed_secs(last.timestamp, report.timestamp);
        let expected_vy = last.velocity.y + GRAVITY * dt;
        if (vy - expected_vy).abs() > JUMP_VELOCITY_TOLERANCE {
            return Err(MoveRejection::continuation(
                self.state(),
                format!(
                    "vertical velocity {:.2} not near expected {:.2}",
                    vy, expected_vy
                ),
            ));
        }

        check_ballistic_height(
            report,
            last.origin.y,
            last.velocity.y,
            dt,
            |state, detail| MoveRejection::continuation(state, detail),
        )
    }
}

impl StateRules for Fall {
    fn state(&self) -> LocomotionState {
        LocomotionState::Fall
    }

    fn can_enter(
        &self,
        from: LocomotionState,
        report: &MoveReport,
        last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        check_transition(from, self.state())?;

        if from.is_grounded() {
            if report.origin.y < FALL_MIN_LEAVE_HEIGHT {
                return Err(MoveRejection::entry(
                    self.state(),
                    format!(
                        "falling from the ground but y={:.2} has not left it (min {:.2})",
                        report.origin.y, FALL_MIN_LEAVE_HEIGHT
                    ),
                ));
            }
            check_take_off_carry_over(self.state(), report, last)?;
        }

        Ok(())
    }

    fn continues_validly(
        &self,
        report: &MoveReport,
        last: &PlayerMovementRecord,
    ) -> ValidationOutcome {
        let vy = report.velocity.y;
        if vy > 0.0 {
            return Err(MoveRejection::continuation(
                self.state(),
                format!("vertical velocity {:.2} is upward", vy),
            ));
        }

        if vy.abs() > TERMINAL_VELOCITY {
            return Err(MoveRejection::continuation(
                self.state(),
                format!(
                    "vertical velocity {:.2} exceeds terminal velocity {:.2}",
                    vy, TERMINAL_VELOCITY
                ),
            ));
        }

        continue_airborne_horizontal(self.state(), report, last)?;

        if last.state == LocomotionState::Fall
            && vy > last.velocity.y + FALL_ACCELERATION_TOLERANCE
        {
            return Err(MoveRejection::continuation(
                self.state(),
                format!(
                    "vertical velocity {:.2} slowed from {:.2} while falling",
                    vy, last.velocity.y
                ),
            ));
        }

        Ok(())
    }
}
