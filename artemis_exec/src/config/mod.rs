//! # Robot configuration
//!
//! Immutable value objects describing how the drive base is tuned: PID gains
//! and convergence tolerances for each kind of motion, global speed and
//! acceleration ceilings, and the physical geometry of the robot.
//!
//! None of these are validated. Out of range values are the responsibility of
//! whoever writes the parameter file.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod defaults;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Convergence thresholds for a control loop. The loop has arrived once both
/// the estimated speed and the residual position error are under these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Units: mm/s for distance, deg/s for heading
    pub speed: f64,

    /// Units: mm for distance, deg for heading
    pub position: f64,
}

/// A complete PID tuning for one kind of motion.
///
/// Turning and straight driving have different dynamics so each gets its own
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Proportional gain
    pub kp: f64,

    /// Integral gain
    pub ki: f64,

    /// Derivative gain
    pub kd: f64,

    pub heading_tolerance: ToleranceConfig,

    pub distance_tolerance: ToleranceConfig,
}

/// Global velocity and acceleration ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Units: mm/s
    pub straight_speed: f64,

    /// Units: mm/s^2
    pub straight_acceleration: Acceleration,

    /// Units: deg/s
    pub turn_rate: f64,

    /// Units: deg/s^2
    pub turn_acceleration: Acceleration,
}

/// Physical constants of the drive base, given to the drive driver once at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Units: mm
    pub wheel_diameter: f64,

    /// Distance between the contact points of the two drive wheels.
    ///
    /// Units: mm
    pub axle_track: f64,
}

/// The full configuration of an Artemis robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtemisConfig {
    pub geometry: GeometryConfig,

    pub motion: MotionConfig,

    pub straight_control: ControlConfig,

    pub turn_control: ControlConfig,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An acceleration limit, either the same when speeding up and slowing down
/// or a separate `[acceleration, deceleration]` pair.
///
/// In TOML this is either a number or a two element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Acceleration {
    Symmetric(f64),
    Asymmetric(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Acceleration {
    /// The limit used while speeding up.
    pub fn accel(&self) -> f64 {
        match *self {
            Acceleration::Symmetric(a) => a,
            Acceleration::Asymmetric(a, _) => a,
        }
    }

    /// The limit used while slowing down.
    pub fn decel(&self) -> f64 {
        match *self {
            Acceleration::Symmetric(a) => a,
            Acceleration::Asymmetric(_, d) => d,
        }
    }
}

impl From<f64> for Acceleration {
    fn from(a: f64) -> Self {
        Acceleration::Symmetric(a)
    }
}

impl MotionConfig {
    /// A copy of these ceilings with the straight speed and/or acceleration
    /// replaced. `None` keeps the configured value.
    pub fn with_straight(&self, speed: Option<f64>, acceleration: Option<f64>) -> Self {
        Self {
            straight_speed: speed.unwrap_or(self.straight_speed),
            straight_acceleration: acceleration
                .map(Acceleration::from)
                .unwrap_or(self.straight_acceleration),
            ..*self
        }
    }

    /// A copy of these ceilings with the turn rate and/or acceleration
    /// replaced. `None` keeps the configured value.
    pub fn with_turn(&self, rate: Option<f64>, acceleration: Option<f64>) -> Self {
        Self {
            turn_rate: rate.unwrap_or(self.turn_rate),
            turn_acceleration: acceleration
                .map(Acceleration::from)
                .unwrap_or(self.turn_acceleration),
            ..*self
        }
    }
}

impl ArtemisConfig {
    /// Load the configuration from a parameter file relative to the
    /// software root's `params` directory.
    pub fn load(param_file_path: &str) -> Result<Self, params::LoadError> {
        params::load(param_file_path)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = ArtemisConfig::default();

        assert_eq!(cfg.geometry, GeometryConfig { wheel_diameter: 63.0, axle_track: 81.0 });
        assert_eq!(cfg.motion.turn_acceleration, Acceleration::Asymmetric(750.0, 200.0));
        assert_eq!(cfg.straight_control.kp, 18_500.0);
        assert_eq!(cfg.turn_control.ki, 21_000.0);
        assert_eq!(cfg, ArtemisConfig::default());
    }

    #[test]
    fn test_overrides_do_not_touch_other_fields() {
        let motion = ArtemisConfig::default().motion;

        let fast = motion.with_straight(Some(900.0), None);
        assert_eq!(fast.straight_speed, 900.0);
        assert_eq!(fast.straight_acceleration, motion.straight_acceleration);
        assert_eq!(fast.turn_rate, motion.turn_rate);

        let gentle_turn = motion.with_turn(None, Some(50.0));
        assert_eq!(gentle_turn.turn_rate, motion.turn_rate);
        assert_eq!(gentle_turn.turn_acceleration, Acceleration::Symmetric(50.0));

        assert_eq!(motion.with_straight(None, None), motion);
    }

    #[test]
    fn test_load_from_toml() {
        let toml_str = r#"
            [geometry]
            wheel_diameter = 62.8
            axle_track = 86.7

            [motion]
            straight_speed = 1000.0
            straight_acceleration = 1000.0
            turn_rate = 360.0
            turn_acceleration = [360.0, 120.0]

            [straight_control]
            kp = 1.0
            ki = 2.0
            kd = 3.0
            heading_tolerance = { speed = 4.0, position = 5.0 }
            distance_tolerance = { speed = 6.0, position = 7.0 }

            [turn_control]
            kp = 8.0
            ki = 9.0
            kd = 10.0
            heading_tolerance = { speed = 11.0, position = 12.0 }
            distance_tolerance = { speed = 13.0, position = 14.0 }
        "#;

        let cfg: ArtemisConfig = params::from_str(toml_str).unwrap();

        assert_eq!(cfg.geometry.axle_track, 86.7);
        assert_eq!(cfg.motion.straight_acceleration, Acceleration::Symmetric(1000.0));
        assert_eq!(cfg.motion.turn_acceleration, Acceleration::Asymmetric(360.0, 120.0));
        assert_eq!(cfg.turn_control.distance_tolerance.position, 14.0);
    }
}
