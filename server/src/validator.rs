//! Validation pipeline for a single move report
//!
//! Checks run in a fixed order and the first failure is returned as is:
//! 1. timestamp bounds and monotonicity
//! 2. sanity: time delta, displacement and speed caps against the last record
//! 3. entry rules of the reported state, only when the state changed
//! 4. continuation rules of the reported state

use crate::locomotion::rules_for;
use clap::ValueEnum;
use shared::{
    validate_sanity, validate_timestamp, LocomotionState, MoveReport, PlayerMovementRecord,
    ValidationOutcome,
};

/// Which checks a [`MoveValidator`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ValidationProfile {
    /// Timestamp, sanity, transition, entry and continuation checks.
    #[default]
    Standard,
    /// Timestamp and sanity checks only. For diagnosing false positives in the state rules.
    Lenient,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveValidator {
    profile: ValidationProfile,
}

impl MoveValidator {
    pub fn new(profile: ValidationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> ValidationProfile {
        self.profile
    }

    pub fn validate(
        &self,
        state: LocomotionState,
        report: &MoveReport,
        last: &PlayerMovementRecord,
        server_now: i64,
    ) -> ValidationOutcome {
        validate_timestamp(last.timestamp, report.timestamp, server_now)?;
        validate_sanity(state, report, last)?;

        if self.profile == ValidationProfile::Lenient {
            return Ok(());
        }

        let rules = rules_for(state);
        if state != last.state {
            rules.can_enter(last.state, report, last)?;
        }
        rules.continues_validly(report, last)
    }
}
