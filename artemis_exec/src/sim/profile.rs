//! Trapezoidal velocity profiles used to time simulated motions

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A velocity profile which accelerates to a ceiling, coasts, then
/// decelerates to rest over a given displacement.
///
/// If the displacement is too short to reach the ceiling the profile is
/// triangular and peaks below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidProfile {
    /// Absolute displacement
    distance: f64,
    direction: f64,
    accel: f64,
    decel: f64,
    peak_speed: f64,
    t_acc: f64,
    t_coast: f64,
    t_dec: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrapezoidProfile {
    /// Build a profile for `displacement` under the given ceilings.
    ///
    /// Non-positive or non-finite ceilings, or zero displacement, give a
    /// profile which finishes instantly.
    pub fn new(displacement: f64, v_max: f64, accel: f64, decel: f64) -> Self {
        let distance = displacement.abs();
        let direction = if displacement < 0.0 { -1.0 } else { 1.0 };

        let usable = [v_max, accel, decel]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0);

        if !usable || distance == 0.0 || !distance.is_finite() {
            return Self {
                distance: if distance.is_finite() { distance } else { 0.0 },
                direction,
                accel: 0.0,
                decel: 0.0,
                peak_speed: 0.0,
                t_acc: 0.0,
                t_coast: 0.0,
                t_dec: 0.0,
            };
        }

        let d_acc = v_max * v_max / (2.0 * accel);
        let d_dec = v_max * v_max / (2.0 * decel);

        let (peak_speed, t_coast) = if distance >= d_acc + d_dec {
            (v_max, (distance - d_acc - d_dec) / v_max)
        }
        else {
            // Triangular, peak where the accel and decel ramps meet
            ((2.0 * distance * accel * decel / (accel + decel)).sqrt(), 0.0)
        };

        Self {
            distance,
            direction,
            accel,
            decel,
            peak_speed,
            t_acc: peak_speed / accel,
            t_coast,
            t_dec: peak_speed / decel,
        }
    }

    /// Total time to complete the profile.
    ///
    /// Units: seconds
    pub fn duration_s(&self) -> f64 {
        self.t_acc + self.t_coast + self.t_dec
    }

    /// Signed displacement covered `t` seconds after the start.
    pub fn position(&self, t: f64) -> f64 {
        let total = self.duration_s();

        let covered = if t <= 0.0 {
            0.0
        }
        else if t >= total {
            self.distance
        }
        else if t < self.t_acc {
            0.5 * self.accel * t * t
        }
        else if t < self.t_acc + self.t_coast {
            0.5 * self.accel * self.t_acc * self.t_acc + self.peak_speed * (t - self.t_acc)
        }
        else {
            let remaining = total - t;
            self.distance - 0.5 * self.decel * remaining * remaining
        };

        self.direction * covered
    }
}
