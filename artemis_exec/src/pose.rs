//! # Pose tracker
//!
//! The controller's dead-reckoned position estimate. Only `MotionCtrl`
//! mutates it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::geometry::Waypoint;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The estimated position of the robot in the field frame.
///
/// Units: millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Pose {
    x: f64,
    y: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn position(&self) -> Waypoint {
        Waypoint::new(self.x, self.y)
    }

    /// Overwrite the estimate with a known position.
    pub(crate) fn reset(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Move the estimate to the end point of a motion which did not target a
    /// known waypoint.
    pub(crate) fn advance(&mut self, to: Waypoint) {
        self.x = to.x;
        self.y = to.y;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pose_updates() {
        let mut pose = Pose::default();
        assert_eq!(pose.position(), Waypoint::new(0.0, 0.0));

        pose.advance(Waypoint::new(3.0, 4.0));
        assert_eq!((pose.x(), pose.y()), (3.0, 4.0));

        pose.reset(-10.0, 250.0);
        assert_eq!(pose.position(), Waypoint::new(-10.0, 250.0));
    }
}
