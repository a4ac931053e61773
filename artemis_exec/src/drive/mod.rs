//! # Drive base interface
//!
//! The boundary between the motion controller and whatever actually moves
//! the wheels. A drive base accepts a control profile, starts turn and
//! straight motions, and reports the gyro heading. Motions run in the
//! background and are tracked through a [`MotionHandle`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod handle;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use handle::*;

use serde::{Deserialize, Serialize};

use crate::config::{ControlConfig, MotionConfig};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A differential drive base with a heading sensor.
pub trait DriveBase: Send {
    /// Apply PID gains, tolerances and speed/acceleration ceilings for the
    /// next motion.
    fn set_profile(
        &mut self,
        control: &ControlConfig,
        motion: &MotionConfig,
    ) -> Result<(), DriveError>;

    /// Start turning in place by `angle_deg`, clockwise positive.
    fn turn(&mut self, angle_deg: f64) -> Result<MotionHandle, DriveError>;

    /// Start driving straight by `distance_mm`, negative is backwards.
    fn straight(&mut self, distance_mm: f64) -> Result<MotionHandle, DriveError>;

    /// The current gyro heading in degrees, clockwise from the field +Y axis.
    ///
    /// Not wrapped, so it may lie outside [0, 360).
    fn heading(&self) -> f64;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The two kinds of primitive motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionKind {
    Turn,
    Straight,
}

/// Failures reported by a drive base.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriveError {
    #[error("The drive motors stalled during a {0:?} motion")]
    Stalled(MotionKind),

    #[error("The drive base is disconnected: {0}")]
    Disconnected(String),

    #[error("The drive base dropped a {0:?} motion without reporting its result")]
    MotionAbandoned(MotionKind),

    #[error("The drive base rejected the control profile: {0}")]
    ProfileRejected(String),
}
