//! # Motion control module
//!
//! Converts field-level requests (face a heading, drive a distance, go to a
//! waypoint) into profile changes and turn/straight primitives on a drive
//! base, bounds each primitive with an optional timeout, and keeps the dead
//! reckoned pose of the robot.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::drive::DriveError;

pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Per-call overrides for a single motion.
///
/// Overrides only apply to the call they are passed to, the configured
/// ceilings are used again afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionOpts {
    /// Speed ceiling, mm/s for straights and deg/s for turns.
    pub speed: Option<f64>,

    /// Acceleration ceiling, mm/s^2 for straights and deg/s^2 for turns.
    pub acceleration: Option<f64>,

    /// Maximum time to allow for the motion before stopping it.
    pub timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which end of the robot leads when driving to a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gear {
    /// Face the waypoint and drive forwards.
    #[default]
    Forward,

    /// Face away from the waypoint and drive backwards, for tooling mounted
    /// on the rear.
    Reverse,
}

/// How a motion ended. Neither is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionOutcome {
    /// The drive reported the motion finished.
    Completed,

    /// The timeout expired first and the motion was stopped where it was.
    TimedOut,
}

/// Where a single motion request is in its execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MotionState {
    #[default]
    Idle,
    ConfiguringProfile,
    Actuating,
    Completed,
    TimedOut,
}

/// Possible errors that can occur during MotionCtrl operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MotionCtrlError {
    #[error("Expected a finite {name}, found {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("Drive base error: {0}")]
    Drive(#[from] DriveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionOpts {
    /// Options with only a timeout set.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    /// Reject non-finite overrides.
    pub(crate) fn validate(&self) -> Result<(), MotionCtrlError> {
        if let Some(speed) = self.speed {
            check_finite("speed override", speed)?;
        }
        if let Some(acceleration) = self.acceleration {
            check_finite("acceleration override", acceleration)?;
        }
        Ok(())
    }
}

impl MotionOutcome {
    /// Combine the outcomes of consecutive motions, any timeout wins.
    pub fn and(self, other: MotionOutcome) -> MotionOutcome {
        match (self, other) {
            (MotionOutcome::Completed, MotionOutcome::Completed) => MotionOutcome::Completed,
            _ => MotionOutcome::TimedOut,
        }
    }
}

impl From<MotionOutcome> for MotionState {
    fn from(outcome: MotionOutcome) -> Self {
        match outcome {
            MotionOutcome::Completed => MotionState::Completed,
            MotionOutcome::TimedOut => MotionState::TimedOut,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// NaN or infinite inputs would corrupt the pose permanently, so they are
/// rejected before anything moves.
pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<(), MotionCtrlError> {
    if value.is_finite() {
        Ok(())
    }
    else {
        Err(MotionCtrlError::NonFinite { name, value })
    }
}
