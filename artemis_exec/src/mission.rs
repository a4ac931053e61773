//! # Mission runner
//!
//! A mission is a timed script of motion commands, one per entry:
//!
//! ```text
//! 0.0: {"type": "RESET_POSITION", "x": 0, "y": 0};
//! 0.5: {"type": "DRIVE_TO", "x": 0, "y": 300, "timeout_ms": 2000};
//! 4.0: {"type": "DRIVE_TO", "x": 0, "y": 0, "gear": "REVERSE"};
//! ```
//!
//! Commands run strictly in order and never before their start time. A
//! command whose start time has already passed (because the one before it
//! overran) starts as soon as the previous one ends. The whole mission is
//! abandoned once the run duration has elapsed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

// Internal
use crate::drive::DriveBase;
use crate::geometry::Waypoint;
use crate::motion_ctrl::{Gear, MotionCtrl, MotionCtrlError, MotionOpts, MotionOutcome};
use util::script_interpreter::{Command, ScriptError, ScriptInterpreter};
use util::time::millis_to_duration;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Length of a competition run.
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(150);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A loaded mission script.
#[derive(Debug)]
pub struct Mission {
    script: ScriptInterpreter<MissionCmd>,

    /// Time after which the mission is abandoned
    run_duration: Duration,
}

/// Summary of a mission run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct MissionReport {
    /// Number of commands which finished
    pub num_cmds_run: usize,

    /// Number of commands which ended with at least one timed out motion
    pub num_timeouts: usize,

    /// True if the run duration expired before the script finished
    pub abandoned: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command in a mission script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionCmd {
    /// Overwrite the position estimate.
    ResetPosition { x: f64, y: f64 },

    /// Turn in place to face a heading in degrees.
    TurnTo {
        heading: f64,
        speed: Option<f64>,
        acceleration: Option<f64>,
        timeout_ms: Option<f64>,
    },

    /// Drive straight along the current heading, in millimeters.
    Straight {
        distance: f64,
        speed: Option<f64>,
        acceleration: Option<f64>,
        timeout_ms: Option<f64>,
    },

    /// Turn towards a point then drive to it.
    DriveTo {
        x: f64,
        y: f64,
        #[serde(default)]
        gear: Gear,
        timeout_ms: Option<f64>,
    },

    /// Do nothing for a while.
    Wait { duration_ms: f64 },
}

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("Could not load the mission script: {0}")]
    Script(#[from] ScriptError),

    #[error("Invalid duration of {0} ms, expected a non-negative number")]
    InvalidDuration(f64),

    #[error("Invalid start time of {0} s")]
    InvalidStartTime(f64),

    #[error("Command at {exec_time_s} s failed: {source}")]
    Motion {
        exec_time_s: f64,
        source: MotionCtrlError,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Mission {
    /// Load a mission from a script file.
    pub fn load<P: AsRef<Path>>(script_path: P) -> Result<Self, MissionError> {
        let script = ScriptInterpreter::new(script_path)?;
        info!(
            "Loaded mission of {} commands, last starting at {:.1} s",
            script.get_num_cmds(),
            script.get_duration()
        );

        Ok(Self {
            script,
            run_duration: DEFAULT_RUN_DURATION,
        })
    }

    /// Parse a mission from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, MissionError> {
        Ok(Self {
            script: ScriptInterpreter::from_str(script)?,
            run_duration: DEFAULT_RUN_DURATION,
        })
    }

    pub fn with_run_duration(mut self, run_duration: Duration) -> Self {
        self.run_duration = run_duration;
        self
    }

    pub fn num_cmds(&self) -> usize {
        self.script.get_num_cmds()
    }

    /// Run the mission to the end of the script, or until the run duration
    /// expires.
    ///
    /// Timed out motions do not stop the mission. Any other failure does.
    pub async fn run<D: DriveBase>(
        mut self,
        ctrl: &mut MotionCtrl<D>,
    ) -> Result<MissionReport, MissionError> {
        let start = Instant::now();
        let mut report = MissionReport::default();

        let result = {
            let script = &mut self.script;
            let report = &mut report;
            let ctrl = &mut *ctrl;

            let body = async move {
                while let Some(Command { exec_time_s, cmd }) = script.pop_next() {
                    let offset = Duration::try_from_secs_f64(exec_time_s)
                        .map_err(|_| MissionError::InvalidStartTime(exec_time_s))?;
                    let exec_at = start
                        .checked_add(offset)
                        .ok_or(MissionError::InvalidStartTime(exec_time_s))?;
                    tokio::time::sleep_until(exec_at).await;

                    debug!("Mission command at {:.2} s: {:?}", exec_time_s, cmd);
                    let outcome = execute(ctrl, &cmd, exec_time_s).await?;

                    report.num_cmds_run += 1;
                    if outcome == MotionOutcome::TimedOut {
                        report.num_timeouts += 1;
                    }
                }

                Ok::<(), MissionError>(())
            };

            tokio::time::timeout(self.run_duration, body).await
        };

        match result {
            Ok(r) => r?,
            Err(_) => {
                warn!(
                    "Run duration of {:?} expired, abandoning mission with {} commands left",
                    self.run_duration,
                    self.script.get_num_cmds()
                );
                ctrl.abort();
                report.abandoned = true;
            }
        }

        info!(
            "Mission ended: {} commands run, {} timed out, pose ({:.1}, {:.1})",
            report.num_cmds_run,
            report.num_timeouts,
            ctrl.x(),
            ctrl.y()
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a single command on the controller.
async fn execute<D: DriveBase>(
    ctrl: &mut MotionCtrl<D>,
    cmd: &MissionCmd,
    exec_time_s: f64,
) -> Result<MotionOutcome, MissionError> {
    let motion_err = |source: MotionCtrlError| MissionError::Motion {
        exec_time_s,
        source,
    };

    match *cmd {
        MissionCmd::ResetPosition { x, y } => {
            ctrl.reset_position(x, y).map_err(motion_err)?;
            Ok(MotionOutcome::Completed)
        }
        MissionCmd::TurnTo {
            heading,
            speed,
            acceleration,
            timeout_ms,
        } => {
            let opts = MotionOpts {
                speed,
                acceleration,
                timeout: timeout(timeout_ms)?,
            };
            ctrl.turn_to(heading, opts).await.map_err(motion_err)
        }
        MissionCmd::Straight {
            distance,
            speed,
            acceleration,
            timeout_ms,
        } => {
            let opts = MotionOpts {
                speed,
                acceleration,
                timeout: timeout(timeout_ms)?,
            };
            ctrl.straight(distance, opts).await.map_err(motion_err)
        }
        MissionCmd::DriveTo {
            x,
            y,
            gear,
            timeout_ms,
        } => ctrl
            .drive_to(Waypoint::new(x, y), gear, timeout(timeout_ms)?)
            .await
            .map_err(motion_err),
        MissionCmd::Wait { duration_ms } => {
            let d = millis_to_duration(duration_ms)
                .ok_or(MissionError::InvalidDuration(duration_ms))?;
            tokio::time::sleep(d).await;
            Ok(MotionOutcome::Completed)
        }
    }
}

fn timeout(timeout_ms: Option<f64>) -> Result<Option<Duration>, MissionError> {
    match timeout_ms {
        Some(ms) => millis_to_duration(ms)
            .map(Some)
            .ok_or(MissionError::InvalidDuration(ms)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ArtemisConfig, GeometryConfig};
    use crate::drive::DriveError;
    use crate::sim::{SimCmd, SimDrive, SimTiming};

    fn ctrl(timing: SimTiming) -> MotionCtrl<SimDrive> {
        MotionCtrl::new(
            SimDrive::new(GeometryConfig::default(), timing),
            ArtemisConfig::default(),
        )
    }

    #[test]
    fn test_parse_commands() {
        let mission = Mission::from_str(
            r#"
            0.0: {"type": "RESET_POSITION", "x": 10, "y": 20};
            0.5: {"type": "TURN_TO", "heading": 90, "speed": 50};
            1.0: {"type": "STRAIGHT", "distance": -30, "timeout_ms": 250};
            1.5: {"type": "DRIVE_TO", "x": 0, "y": 100, "gear": "REVERSE"};
            2.0: {"type": "DRIVE_TO", "x": 0, "y": 0};
            2.5: {"type": "WAIT", "duration_ms": 100};
            "#,
        )
        .unwrap();

        assert_eq!(mission.num_cmds(), 6);

        let mut script = mission.script;
        let cmds: Vec<MissionCmd> = std::iter::from_fn(|| script.pop_next().map(|c| c.cmd)).collect();

        assert_eq!(cmds[0], MissionCmd::ResetPosition { x: 10.0, y: 20.0 });
        assert_eq!(
            cmds[1],
            MissionCmd::TurnTo {
                heading: 90.0,
                speed: Some(50.0),
                acceleration: None,
                timeout_ms: None
            }
        );
        assert_eq!(
            cmds[2],
            MissionCmd::Straight {
                distance: -30.0,
                speed: None,
                acceleration: None,
                timeout_ms: Some(250.0)
            }
        );
        assert!(matches!(cmds[3], MissionCmd::DriveTo { gear: Gear::Reverse, .. }));
        assert!(matches!(cmds[4], MissionCmd::DriveTo { gear: Gear::Forward, .. }));
        assert_eq!(cmds[5], MissionCmd::Wait { duration_ms: 100.0 });
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(matches!(
            Mission::from_str(r#"0.0: {"type": "LIFT_ARM", "angle": 90};"#),
            Err(MissionError::Script(ScriptError::InvalidCommand(..)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_in_order_and_on_time() {
        let mut ctrl = ctrl(SimTiming::Instant);
        let mission = Mission::from_str(
            r#"
            0.0: {"type": "RESET_POSITION", "x": 0, "y": 100};
            1.0: {"type": "DRIVE_TO", "x": 100, "y": 100};
            2.0: {"type": "DRIVE_TO", "x": 100, "y": 0, "gear": "REVERSE"};
            "#,
        )
        .unwrap();

        let start = Instant::now();
        let report = mission.run(&mut ctrl).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(
            report,
            MissionReport {
                num_cmds_run: 3,
                num_timeouts: 0,
                abandoned: false
            }
        );
        assert_eq!((ctrl.x(), ctrl.y()), (100.0, 0.0));

        let motions = ctrl.drive().motion_cmds();
        assert_eq!(motions.len(), 4);
        assert_eq!(motions[1], SimCmd::Straight { distance_mm: 100.0 });
        assert_eq!(motions[3], SimCmd::Straight { distance_mm: -100.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_do_not_stop_mission() {
        let mut ctrl = ctrl(SimTiming::NeverFinish);
        let mission = Mission::from_str(
            r#"
            0.0: {"type": "STRAIGHT", "distance": 200, "timeout_ms": 500};
            0.1: {"type": "WAIT", "duration_ms": 100};
            "#,
        )
        .unwrap();

        let report = mission.run(&mut ctrl).await.unwrap();

        assert_eq!(report.num_cmds_run, 2);
        assert_eq!(report.num_timeouts, 1);
        assert!((ctrl.y() - 200.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_duration_abandons_mission() {
        let mut ctrl = ctrl(SimTiming::NeverFinish);
        let mission = Mission::from_str(
            r#"
            0.0: {"type": "TURN_TO", "heading": 90};
            5.0: {"type": "STRAIGHT", "distance": 100};
            "#,
        )
        .unwrap()
        .with_run_duration(Duration::from_secs(2));

        let start = Instant::now();
        let report = mission.run(&mut ctrl).await.unwrap();

        assert!(report.abandoned);
        assert_eq!(report.num_cmds_run, 0);
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(ctrl.state(), crate::motion_ctrl::MotionState::Idle);
        assert_eq!(ctrl.drive().motion_cmds().len(), 1);
    }

    #[tokio::test]
    async fn test_drive_failure_stops_mission() {
        let mut drive = SimDrive::new(GeometryConfig::default(), SimTiming::Instant);
        drive.inject_fault(DriveError::Disconnected("port A".into()));
        let mut ctrl = MotionCtrl::new(drive, ArtemisConfig::default());

        let mission = Mission::from_str(
            r#"
            0.0: {"type": "STRAIGHT", "distance": 100};
            0.0: {"type": "STRAIGHT", "distance": 100};
            "#,
        )
        .unwrap();

        match mission.run(&mut ctrl).await {
            Err(MissionError::Motion {
                exec_time_s,
                source: MotionCtrlError::Drive(DriveError::Disconnected(_)),
            }) => assert_eq!(exec_time_s, 0.0),
            r => panic!("Expected a drive failure, got {:?}", r),
        }
        assert_eq!(ctrl.drive().motion_cmds().len(), 1);
        assert!(matches!(
            ctrl.drive().motion_cmds()[0],
            SimCmd::Straight { .. }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_start_time_rejected() {
        let mut ctrl = ctrl(SimTiming::Instant);
        let mission = Mission::from_str(
            r#"10000000000000000000: {"type": "WAIT", "duration_ms": 1};"#,
        )
        .unwrap()
        .with_run_duration(Duration::from_secs(1));

        assert!(matches!(
            mission.run(&mut ctrl).await,
            Err(MissionError::InvalidStartTime(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_timeout_rejected() {
        let mut ctrl = ctrl(SimTiming::Instant);
        let mission =
            Mission::from_str(r#"0.0: {"type": "STRAIGHT", "distance": 10, "timeout_ms": -5};"#)
                .unwrap();

        assert!(matches!(
            mission.run(&mut ctrl).await,
            Err(MissionError::InvalidDuration(ms)) if ms == -5.0
        ));
        assert!(ctrl.drive().cmds().is_empty());
    }
}
