//! # Simulated drive base
//!
//! A drive base which moves no hardware. It integrates the turns it is given
//! into a gyro heading, records every command it receives, and can time its
//! motions from the active profile so that timeouts and telemetry behave the
//! way they would on the robot.
//!
//! The command log renders as a table for quickly checking what a mission
//! script asked the robot to do.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod profile;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

// Internal
pub use profile::TrapezoidProfile;
use crate::config::{ControlConfig, GeometryConfig, MotionConfig};
use crate::drive::{motion_channel, DriveBase, DriveError, MotionHandle, MotionKind};
use crate::telemetry::{TelemetryEntry, TelemetrySource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A simulated differential drive base.
pub struct SimDrive {
    timing: SimTiming,
    shared: Arc<Mutex<SimShared>>,

    /// Failure to report for the next motion instead of moving
    fault: Option<DriveError>,
}

/// A read-only view of a `SimDrive` which can be held while the drive is
/// owned by a controller, e.g. by a telemetry sampler.
#[derive(Clone)]
pub struct SimProbe {
    shared: Arc<Mutex<SimShared>>,
}

/// State shared between the drive and its in-flight motion tasks.
#[derive(Debug, Default)]
struct SimShared {
    heading_deg: f64,
    odometer_mm: f64,
    moving: Option<MotionKind>,
    profile: Option<(ControlConfig, MotionConfig)>,
    log: Vec<SimCmd>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How long simulated motions take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimTiming {
    /// Every motion finishes as soon as it starts.
    Instant,

    /// Motions follow a trapezoidal profile under the active speed and
    /// acceleration ceilings. `time_scale` stretches (> 1) or compresses
    /// (< 1) the simulated time.
    Profiled { time_scale: f64 },

    /// Motions never finish on their own, as if the robot were pinned
    /// against a wall. Only a stop request ends them.
    NeverFinish,
}

/// A command received by the simulated drive.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCmd {
    SetProfile {
        control: ControlConfig,
        motion: MotionConfig,
    },
    Turn {
        angle_deg: f64,
    },
    Straight {
        distance_mm: f64,
    },

    /// A motion was stopped early, having covered `done` of its amount.
    Stopped {
        kind: MotionKind,
        done: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrive {
    /// Create a new simulated drive facing heading 0.
    pub fn new(geometry: GeometryConfig, timing: SimTiming) -> Self {
        debug!(
            "SimDrive created: wheel diameter {} mm, axle track {} mm, timing {:?}",
            geometry.wheel_diameter, geometry.axle_track, timing
        );

        Self {
            timing,
            shared: Arc::new(Mutex::new(SimShared::default())),
            fault: None,
        }
    }

    /// A probe for reading the drive's state from elsewhere.
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            shared: self.shared.clone(),
        }
    }

    /// Make the next motion fail with `error`, reported through its handle.
    pub fn inject_fault(&mut self, error: DriveError) {
        self.fault = Some(error);
    }

    /// Set the gyro heading, as the hub does when it is zeroed.
    pub fn reset_heading(&mut self, heading_deg: f64) {
        lock(&self.shared).heading_deg = heading_deg;
    }

    /// Every command received so far.
    pub fn cmds(&self) -> Vec<SimCmd> {
        lock(&self.shared).log.clone()
    }

    /// Only the turn and straight commands received so far, without profile
    /// changes.
    pub fn motion_cmds(&self) -> Vec<SimCmd> {
        lock(&self.shared)
            .log
            .iter()
            .filter(|c| matches!(c, SimCmd::Turn { .. } | SimCmd::Straight { .. }))
            .cloned()
            .collect()
    }

    /// The profile most recently applied, if any.
    pub fn active_profile(&self) -> Option<(ControlConfig, MotionConfig)> {
        lock(&self.shared).profile
    }

    /// Total distance driven, counting backwards travel as negative.
    ///
    /// Units: millimeters
    pub fn odometer(&self) -> f64 {
        lock(&self.shared).odometer_mm
    }

    /// Render the command log as an ASCII table.
    pub fn table(&self) -> String {
        let shared = lock(&self.shared);

        let headers = vec!["#".to_string(), "command".to_string(), "params".to_string()];
        let rows: Vec<Vec<String>> = shared
            .log
            .iter()
            .enumerate()
            .map(|(i, cmd)| {
                let (name, params) = cmd.describe();
                vec![i.to_string(), name.to_string(), params]
            })
            .collect();

        render_table(&headers, &rows)
    }

    /// Start a motion of `kind` covering `amount` (degrees or millimeters).
    fn start(&mut self, kind: MotionKind, amount: f64) -> Result<MotionHandle, DriveError> {
        let motion = {
            let mut shared = lock(&self.shared);
            shared.log.push(match kind {
                MotionKind::Turn => SimCmd::Turn { angle_deg: amount },
                MotionKind::Straight => SimCmd::Straight { distance_mm: amount },
            });
            shared.profile.map(|(_, m)| m).unwrap_or_default()
        };

        if let Some(error) = self.fault.take() {
            debug!("SimDrive reporting injected fault: {}", error);
            return Ok(MotionHandle::finished(kind, Err(error)));
        }

        let profile = match kind {
            MotionKind::Turn => TrapezoidProfile::new(
                amount,
                motion.turn_rate,
                motion.turn_acceleration.accel(),
                motion.turn_acceleration.decel(),
            ),
            MotionKind::Straight => TrapezoidProfile::new(
                amount,
                motion.straight_speed,
                motion.straight_acceleration.accel(),
                motion.straight_acceleration.decel(),
            ),
        };

        let time_scale = match self.timing {
            SimTiming::Profiled { time_scale } if time_scale.is_finite() && time_scale > 0.0 => {
                time_scale
            }
            _ => 1.0,
        };

        let duration = match self.timing {
            SimTiming::Instant => {
                lock(&self.shared).apply(kind, amount);
                return Ok(MotionHandle::finished(kind, Ok(())));
            }
            // A profile too long to represent never finishes on its own
            SimTiming::Profiled { .. } => {
                Duration::try_from_secs_f64(profile.duration_s() * time_scale).ok()
            }
            SimTiming::NeverFinish => None,
        };
        let profiled = matches!(self.timing, SimTiming::Profiled { .. });

        trace!("SimDrive {:?} of {:.2} will take {:?}", kind, amount, duration);

        let (handle, mut link) = motion_channel(kind);
        let shared = self.shared.clone();

        lock(&shared).moving = Some(kind);

        tokio::spawn(async move {
            let started = Instant::now();

            let stopped = match duration {
                Some(d) => tokio::select! {
                    biased;
                    _ = link.stop_requested() => true,
                    _ = tokio::time::sleep(d) => false,
                },
                None => {
                    link.stop_requested().await;
                    true
                }
            };

            let mut state = lock(&shared);
            state.moving = None;

            if stopped {
                // Work out how far along the profile the robot got
                let done = if profiled {
                    profile.position(started.elapsed().as_secs_f64() / time_scale)
                }
                else {
                    0.0
                };
                state.apply(kind, done);
                state.log.push(SimCmd::Stopped { kind, done });
                trace!("SimDrive {:?} stopped after {:.2} of {:.2}", kind, done, amount);
            }
            else {
                state.apply(kind, amount);
                drop(state);
                link.complete(Ok(()));
            }
        });

        Ok(handle)
    }
}

impl DriveBase for SimDrive {
    fn set_profile(
        &mut self,
        control: &ControlConfig,
        motion: &MotionConfig,
    ) -> Result<(), DriveError> {
        let mut shared = lock(&self.shared);
        shared.profile = Some((*control, *motion));
        shared.log.push(SimCmd::SetProfile {
            control: *control,
            motion: *motion,
        });
        Ok(())
    }

    fn turn(&mut self, angle_deg: f64) -> Result<MotionHandle, DriveError> {
        self.start(MotionKind::Turn, angle_deg)
    }

    fn straight(&mut self, distance_mm: f64) -> Result<MotionHandle, DriveError> {
        self.start(MotionKind::Straight, distance_mm)
    }

    fn heading(&self) -> f64 {
        lock(&self.shared).heading_deg
    }
}

impl SimProbe {
    pub fn moving(&self) -> Option<MotionKind> {
        lock(&self.shared).moving
    }
}

impl TelemetrySource for SimProbe {
    fn sample(&self, time_s: f64) -> Vec<TelemetryEntry> {
        let shared = lock(&self.shared);

        vec![
            TelemetryEntry::new("hub", time_s, "heading", shared.heading_deg),
            TelemetryEntry::new("drive", time_s, "distance", shared.odometer_mm),
            TelemetryEntry::new(
                "drive",
                time_s,
                "moving",
                if shared.moving.is_some() { 1.0 } else { 0.0 },
            ),
        ]
    }
}

impl SimShared {
    /// Apply `amount` of progress on a motion of `kind`.
    fn apply(&mut self, kind: MotionKind, amount: f64) {
        match kind {
            MotionKind::Turn => self.heading_deg += amount,
            MotionKind::Straight => self.odometer_mm += amount,
        }
    }
}

impl SimCmd {
    /// Name and parameter summary for table rendering.
    fn describe(&self) -> (&'static str, String) {
        match self {
            SimCmd::SetProfile { control, motion } => (
                "set_profile",
                format!(
                    "kp={}, ki={}, kd={}, speed={}, turn_rate={}",
                    control.kp, control.ki, control.kd, motion.straight_speed, motion.turn_rate
                ),
            ),
            SimCmd::Turn { angle_deg } => ("turn", format!("angle={:.2}", angle_deg)),
            SimCmd::Straight { distance_mm } => {
                ("straight", format!("distance={:.2}", distance_mm))
            }
            SimCmd::Stopped { kind, done } => ("stopped", format!("{:?}, done={:.2}", kind, done)),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Lock the shared state. A panic in a motion task can't leave it half
/// updated, so poisoning is ignored.
fn lock(shared: &Mutex<SimShared>) -> MutexGuard<'_, SimShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lay out rows as left aligned columns separated by `|`.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let separator = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut lines = vec![format_row(headers), separator];
    lines.extend(rows.iter().map(|r| format_row(r)));
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
