//! # Field geometry
//!
//! Conversions between cartesian positions on the field and the polar
//! (heading, distance) commands executed by the drive base.
//!
//! Headings are in degrees, measured clockwise from the field +Y axis so that
//! they agree with the gyro: 0 faces +Y, 90 faces +X. Distances are in
//! millimeters and may be negative, meaning travel backwards along the
//! heading.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use util::maths::get_ang_dist_deg;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position in the field frame.
///
/// Units: millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
}

/// A heading and distance which, driven from a start point, reaches a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Units: degrees
    pub heading_deg: f64,

    /// Units: millimeters
    pub distance_mm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl Trajectory {
    /// The trajectory which reaches the same end point while facing the
    /// opposite direction, i.e. driving there backwards.
    ///
    /// The heading is not wrapped, turn calculations handle that.
    pub fn reversed(self) -> Self {
        Self {
            heading_deg: self.heading_deg + 180.0,
            distance_mm: -self.distance_mm,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the heading and distance to drive from `start` to `end`.
///
/// A zero length trajectory has a heading of 0.
pub fn compute_trajectory(start: Waypoint, end: Waypoint) -> Trajectory {
    let delta = end.as_vector() - start.as_vector();

    // atan2 takes (x, y) rather than (y, x) because headings are measured
    // from +Y
    Trajectory {
        heading_deg: delta.x.atan2(delta.y).to_degrees(),
        distance_mm: delta.norm(),
    }
}

/// Dead reckon the position reached by driving `distance_mm` from `start`
/// along `heading_deg`.
///
/// This is the inverse of `compute_trajectory`. Headings are measured from
/// +Y, so the sine goes with X and the cosine with Y.
pub fn compute_new_position(start: Waypoint, heading_deg: f64, distance_mm: f64) -> Waypoint {
    let (sin, cos) = heading_deg.to_radians().sin_cos();
    let end = start.as_vector() + Vector2::new(sin, cos) * distance_mm;

    Waypoint::new(end.x, end.y)
}

/// The shortest turn which takes the robot from `current_deg` to face
/// `target_deg`, in the range [-180, 180).
pub fn shortest_turn(current_deg: f64, target_deg: f64) -> f64 {
    get_ang_dist_deg(current_deg, target_deg)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
