//! Built-in tuning for the competition robot

use super::*;

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            speed: 38.0,
            position: 5.0,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            wheel_diameter: 63.0,
            axle_track: 81.0,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            straight_speed: 350.0,
            straight_acceleration: Acceleration::Symmetric(800.0),
            turn_rate: 100.0,
            turn_acceleration: Acceleration::Asymmetric(750.0, 200.0),
        }
    }
}

impl Default for ArtemisConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            motion: MotionConfig::default(),
            straight_control: ControlConfig {
                kp: 18_500.0,
                ki: 410.0,
                kd: 100.0,
                heading_tolerance: ToleranceConfig::default(),
                distance_tolerance: ToleranceConfig {
                    speed: 27.0,
                    position: 5.0,
                },
            },
            turn_control: ControlConfig {
                kp: 12_000.0,
                ki: 21_000.0,
                kd: 3000.0,
                heading_tolerance: ToleranceConfig::default(),
                distance_tolerance: ToleranceConfig {
                    speed: 27.0,
                    position: 5.0,
                },
            },
        }
    }
}
