//! Motion control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};

// Internal
use super::*;
use crate::config::{ArtemisConfig, ControlConfig, MotionConfig};
use crate::drive::{DriveBase, MotionHandle, MotionKind};
use crate::geometry::{compute_new_position, compute_trajectory, shortest_turn, Waypoint};
use crate::pose::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The dead-reckoning motion controller.
///
/// Owns the drive base it actuates and the single pose estimate of the
/// robot. All operations take `&mut self`, so only one motion can be in
/// flight at a time.
pub struct MotionCtrl<D: DriveBase> {
    drive: D,

    /// Read-only for the lifetime of the controller
    config: ArtemisConfig,

    pose: Pose,

    /// State of the current (or last) motion request
    state: MotionState,

    report: StatusReport,
}

/// Counters describing what the controller has done so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    /// Number of turn and straight primitives started
    pub num_motions: usize,

    /// Number of primitives stopped by their timeout
    pub num_timeouts: usize,

    /// How the last primitive ended
    pub last_outcome: Option<MotionOutcome>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D: DriveBase> MotionCtrl<D> {
    /// Create a new controller at (0, 0).
    pub fn new(drive: D, config: ArtemisConfig) -> Self {
        Self {
            drive,
            config,
            pose: Pose::default(),
            state: MotionState::Idle,
            report: StatusReport::default(),
        }
    }

    pub fn x(&self) -> f64 {
        self.pose.x()
    }

    pub fn y(&self) -> f64 {
        self.pose.y()
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn config(&self) -> &ArtemisConfig {
        &self.config
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    /// Overwrite the pose estimate with a known position, for instance when
    /// the robot is placed in a launch area.
    pub fn reset_position(&mut self, x: f64, y: f64) -> Result<(), MotionCtrlError> {
        check_finite("x coordinate", x)?;
        check_finite("y coordinate", y)?;

        self.pose.reset(x, y);
        debug!("Position reset to ({:.1}, {:.1})", x, y);

        Ok(())
    }

    /// Return to `Idle` after an in-flight motion future was dropped.
    ///
    /// Dropping the future drops its motion handle, which already asks the
    /// drive to stop.
    pub fn abort(&mut self) {
        if self.state != MotionState::Idle {
            warn!("Motion abandoned while {:?}", self.state);
            self.set_state(MotionState::Idle);
        }
    }

    /// Turn in place to face `heading_deg`, taking the shortest way round.
    pub async fn turn_to(
        &mut self,
        heading_deg: f64,
        opts: MotionOpts,
    ) -> Result<MotionOutcome, MotionCtrlError> {
        check_finite("heading", heading_deg)?;
        opts.validate()?;

        let angle = shortest_turn(self.drive.heading(), heading_deg);
        debug!(
            "Turning to {:.2} deg (turn of {:.2} deg from {:.2} deg)",
            heading_deg,
            angle,
            self.drive.heading()
        );

        let control = self.config.turn_control;
        let motion = self.config.motion.with_turn(opts.speed, opts.acceleration);

        self.actuate(MotionKind::Turn, angle, &control, &motion, opts.timeout)
            .await
    }

    /// Drive straight by `distance_mm` along the current heading, negative
    /// is backwards.
    ///
    /// The pose is advanced by the commanded distance whether the motion
    /// completes or times out.
    pub async fn straight(
        &mut self,
        distance_mm: f64,
        opts: MotionOpts,
    ) -> Result<MotionOutcome, MotionCtrlError> {
        check_finite("distance", distance_mm)?;
        opts.validate()?;

        debug!("Driving straight {:.1} mm", distance_mm);

        let control = self.config.straight_control;
        let motion = self
            .config
            .motion
            .with_straight(opts.speed, opts.acceleration);

        let outcome = self
            .actuate(MotionKind::Straight, distance_mm, &control, &motion, opts.timeout)
            .await?;

        let end = compute_new_position(self.pose.position(), self.drive.heading(), distance_mm);
        self.pose.advance(end);
        trace!("Pose advanced to ({:.1}, {:.1})", end.x, end.y);

        Ok(outcome)
    }

    /// Drive to `target` by turning to face it (or face away from it in
    /// reverse) then driving straight.
    ///
    /// `timeout` bounds each of the two motions separately. Once both have
    /// ended the pose is snapped to `target`.
    pub async fn drive_to(
        &mut self,
        target: Waypoint,
        gear: Gear,
        timeout: Option<Duration>,
    ) -> Result<MotionOutcome, MotionCtrlError> {
        check_finite("target x coordinate", target.x)?;
        check_finite("target y coordinate", target.y)?;

        let mut traj = compute_trajectory(self.pose.position(), target);
        if gear == Gear::Reverse {
            traj = traj.reversed();
        }

        debug!(
            "Driving to ({:.1}, {:.1}) in {:?}: heading {:.2} deg, distance {:.1} mm",
            target.x, target.y, gear, traj.heading_deg, traj.distance_mm
        );

        let opts = MotionOpts {
            timeout,
            ..Default::default()
        };

        let turned = self.turn_to(traj.heading_deg, opts).await?;
        let driven = self.straight(traj.distance_mm, opts).await?;

        // Snap to the target rather than keep the integrated estimate
        self.pose.reset(target.x, target.y);

        Ok(turned.and(driven))
    }

    /// Load the profile, start the motion and race it against the timeout.
    async fn actuate(
        &mut self,
        kind: MotionKind,
        amount: f64,
        control: &ControlConfig,
        motion: &MotionConfig,
        timeout: Option<Duration>,
    ) -> Result<MotionOutcome, MotionCtrlError> {
        let result = self.run_motion(kind, amount, control, motion, timeout).await;

        match result {
            Ok(outcome) => {
                self.report.last_outcome = Some(outcome);
                if outcome == MotionOutcome::TimedOut {
                    self.report.num_timeouts += 1;
                }
                self.set_state(outcome.into());
            }
            Err(ref e) => warn!("{:?} motion of {:.2} failed: {}", kind, amount, e),
        }

        self.set_state(MotionState::Idle);

        result
    }

    async fn run_motion(
        &mut self,
        kind: MotionKind,
        amount: f64,
        control: &ControlConfig,
        motion: &MotionConfig,
        timeout: Option<Duration>,
    ) -> Result<MotionOutcome, MotionCtrlError> {
        self.set_state(MotionState::ConfiguringProfile);
        self.drive.set_profile(control, motion)?;

        self.set_state(MotionState::Actuating);
        let handle = match kind {
            MotionKind::Turn => self.drive.turn(amount)?,
            MotionKind::Straight => self.drive.straight(amount)?,
        };
        self.report.num_motions += 1;

        let outcome = race_deadline(handle, timeout).await?;
        if outcome == MotionOutcome::TimedOut {
            warn!(
                "{:?} motion of {:.2} timed out after {:?}",
                kind, amount, timeout
            );
        }

        Ok(outcome)
    }

    fn set_state(&mut self, state: MotionState) {
        if state != self.state {
            trace!("MotionCtrl state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Wait for the motion to end, or for `timeout` to expire, whichever comes
/// first. On timeout the motion is told to stop.
async fn race_deadline(
    mut handle: MotionHandle,
    timeout: Option<Duration>,
) -> Result<MotionOutcome, DriveError> {
    let timeout = match timeout {
        Some(t) => t,
        None => {
            handle.wait().await?;
            return Ok(MotionOutcome::Completed);
        }
    };

    let finished = tokio::select! {
        biased;
        r = handle.wait() => Some(r),
        _ = tokio::time::sleep(timeout) => None,
    };

    match finished {
        Some(r) => r.map(|_| MotionOutcome::Completed),
        None => {
            handle.cancel();
            Ok(MotionOutcome::TimedOut)
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::GeometryConfig;
    use crate::sim::{SimCmd, SimDrive, SimTiming};
    use tokio::time::Instant;

    const EPS: f64 = 1e-9;

    fn ctrl(timing: SimTiming) -> MotionCtrl<SimDrive> {
        MotionCtrl::new(
            SimDrive::new(GeometryConfig::default(), timing),
            ArtemisConfig::default(),
        )
    }

    fn assert_motions(ctrl: &MotionCtrl<SimDrive>, expected: &[(MotionKind, f64)]) {
        let cmds = ctrl.drive().motion_cmds();
        assert_eq!(cmds.len(), expected.len(), "{:?}", cmds);

        for (cmd, (kind, amount)) in cmds.iter().zip(expected) {
            match (cmd, kind) {
                (SimCmd::Turn { angle_deg }, MotionKind::Turn) => {
                    assert!((angle_deg - amount).abs() < EPS, "{:?}", cmd)
                }
                (SimCmd::Straight { distance_mm }, MotionKind::Straight) => {
                    assert!((distance_mm - amount).abs() < EPS, "{:?}", cmd)
                }
                _ => panic!("Expected {:?} of {}, got {:?}", kind, amount, cmd),
            }
        }
    }

    #[tokio::test]
    async fn test_drive_to_forward() {
        let mut ctrl = ctrl(SimTiming::Instant);

        let outcome = ctrl
            .drive_to(Waypoint::new(0.0, 100.0), Gear::Forward, None)
            .await
            .unwrap();

        assert_eq!(outcome, MotionOutcome::Completed);
        assert_motions(&ctrl, &[(MotionKind::Turn, 0.0), (MotionKind::Straight, 100.0)]);
        assert_eq!((ctrl.x(), ctrl.y()), (0.0, 100.0));
        assert_eq!(ctrl.state(), MotionState::Idle);
        assert_eq!(ctrl.report().num_motions, 2);
    }

    #[tokio::test]
    async fn test_drive_to_reverse() {
        let mut ctrl = ctrl(SimTiming::Instant);

        ctrl.drive_to(Waypoint::new(100.0, 0.0), Gear::Reverse, None)
            .await
            .unwrap();

        // Heading 270 is reached by turning -90 from 0
        assert_motions(&ctrl, &[(MotionKind::Turn, -90.0), (MotionKind::Straight, -100.0)]);
        assert_eq!((ctrl.x(), ctrl.y()), (100.0, 0.0));
    }

    #[tokio::test]
    async fn test_reverse_and_forward_reach_same_pose() {
        let target = Waypoint::new(-40.0, 75.0);

        let mut fwd = ctrl(SimTiming::Instant);
        fwd.drive_to(target, Gear::Forward, None).await.unwrap();

        let mut rev = ctrl(SimTiming::Instant);
        rev.drive_to(target, Gear::Reverse, None).await.unwrap();

        assert_eq!(fwd.pose(), rev.pose());
        assert!((fwd.drive().odometer() + rev.drive().odometer()).abs() < EPS);
    }

    #[tokio::test]
    async fn test_reset_position_changes_trajectory() {
        let mut ctrl = ctrl(SimTiming::Instant);

        ctrl.drive_to(Waypoint::new(0.0, 100.0), Gear::Forward, None)
            .await
            .unwrap();

        // Without the reset this would be a straight of 100 along heading 0
        ctrl.reset_position(0.0, 200.0).unwrap();
        ctrl.drive_to(Waypoint::new(0.0, 300.0), Gear::Forward, None)
            .await
            .unwrap();

        assert_motions(
            &ctrl,
            &[
                (MotionKind::Turn, 0.0),
                (MotionKind::Straight, 100.0),
                (MotionKind::Turn, 0.0),
                (MotionKind::Straight, 100.0),
            ],
        );
        assert_eq!((ctrl.x(), ctrl.y()), (0.0, 300.0));
    }

    #[tokio::test]
    async fn test_turn_to_takes_shortest_way() {
        let mut ctrl = ctrl(SimTiming::Instant);

        ctrl.turn_to(350.0, MotionOpts::default()).await.unwrap();
        ctrl.turn_to(10.0, MotionOpts::default()).await.unwrap();

        assert_motions(&ctrl, &[(MotionKind::Turn, -10.0), (MotionKind::Turn, 20.0)]);
        assert!((ctrl.drive().heading() - 10.0).abs() < EPS);
    }

    #[tokio::test]
    async fn test_turn_to_uses_gyro_heading() {
        let mut ctrl = ctrl(SimTiming::Instant);
        ctrl.drive.reset_heading(350.0);

        ctrl.turn_to(10.0, MotionOpts::default()).await.unwrap();

        assert_motions(&ctrl, &[(MotionKind::Turn, 20.0)]);
    }

    #[tokio::test]
    async fn test_straight_advances_pose_along_heading() {
        let mut ctrl = ctrl(SimTiming::Instant);

        ctrl.turn_to(90.0, MotionOpts::default()).await.unwrap();
        ctrl.straight(50.0, MotionOpts::default()).await.unwrap();

        assert!((ctrl.x() - 50.0).abs() < EPS);
        assert!(ctrl.y().abs() < EPS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_straight_times_out() {
        let mut ctrl = ctrl(SimTiming::NeverFinish);
        let start = Instant::now();

        let outcome = ctrl
            .straight(200.0, MotionOpts::with_timeout(Duration::from_millis(500)))
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert_eq!(outcome, MotionOutcome::TimedOut);
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(600));

        // The full commanded distance is still integrated
        assert!((ctrl.y() - 200.0).abs() < EPS);
        assert_eq!(ctrl.state(), MotionState::Idle);
        assert_eq!(ctrl.report().num_timeouts, 1);
        assert_eq!(ctrl.report().last_outcome, Some(MotionOutcome::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_motion_is_stopped() {
        let mut ctrl = ctrl(SimTiming::NeverFinish);

        ctrl.turn_to(90.0, MotionOpts::with_timeout(Duration::from_millis(100)))
            .await
            .unwrap();

        // Let the simulated motion task see the stop request
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(ctrl
            .drive()
            .cmds()
            .iter()
            .any(|c| matches!(c, SimCmd::Stopped { kind: MotionKind::Turn, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_to_reports_any_timeout() {
        let mut ctrl = ctrl(SimTiming::NeverFinish);

        let outcome = ctrl
            .drive_to(
                Waypoint::new(30.0, 40.0),
                Gear::Forward,
                Some(Duration::from_millis(200)),
            )
            .await
            .unwrap();

        assert_eq!(outcome, MotionOutcome::TimedOut);
        assert_eq!((ctrl.x(), ctrl.y()), (30.0, 40.0));
        assert_eq!(ctrl.report().num_timeouts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profiled_motion_completes_within_timeout() {
        let mut ctrl = ctrl(SimTiming::Profiled { time_scale: 1.0 });

        let outcome = ctrl
            .straight(100.0, MotionOpts::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(outcome, MotionOutcome::Completed);
        assert!((ctrl.drive().odometer() - 100.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crawling_override_bounded_by_timeout() {
        let mut ctrl = ctrl(SimTiming::Profiled { time_scale: 1.0 });
        let opts = MotionOpts {
            speed: Some(1e-300),
            acceleration: None,
            timeout: Some(Duration::from_millis(500)),
        };
        let start = Instant::now();

        let outcome = ctrl.straight(100.0, opts).await.unwrap();

        assert_eq!(outcome, MotionOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_millis(600));
        assert!((ctrl.y() - 100.0).abs() < EPS);
    }

    #[tokio::test]
    async fn test_non_finite_input_rejected() {
        let mut ctrl = ctrl(SimTiming::Instant);

        assert!(matches!(
            ctrl.straight(f64::NAN, MotionOpts::default()).await,
            Err(MotionCtrlError::NonFinite { .. })
        ));
        assert!(matches!(
            ctrl.turn_to(f64::INFINITY, MotionOpts::default()).await,
            Err(MotionCtrlError::NonFinite { .. })
        ));
        assert!(matches!(
            ctrl.drive_to(Waypoint::new(0.0, f64::NAN), Gear::Forward, None).await,
            Err(MotionCtrlError::NonFinite { .. })
        ));
        assert!(ctrl.reset_position(f64::NAN, 0.0).is_err());

        let opts = MotionOpts {
            speed: Some(f64::NAN),
            ..Default::default()
        };
        assert!(ctrl.straight(10.0, opts).await.is_err());

        assert!(ctrl.drive().cmds().is_empty());
        assert_eq!(ctrl.pose(), Pose::default());
    }

    #[tokio::test]
    async fn test_overrides_not_persisted() {
        let mut ctrl = ctrl(SimTiming::Instant);
        let opts = MotionOpts {
            speed: Some(100.0),
            acceleration: Some(50.0),
            timeout: None,
        };

        ctrl.straight(10.0, opts).await.unwrap();
        let (control, motion) = ctrl.drive().active_profile().unwrap();
        assert_eq!(control, ctrl.config().straight_control);
        assert_eq!(motion.straight_speed, 100.0);
        assert_eq!(motion.straight_acceleration.accel(), 50.0);

        ctrl.straight(10.0, MotionOpts::default()).await.unwrap();
        let (_, motion) = ctrl.drive().active_profile().unwrap();
        assert_eq!(motion, ctrl.config().motion);

        ctrl.turn_to(45.0, MotionOpts::default()).await.unwrap();
        let (control, _) = ctrl.drive().active_profile().unwrap();
        assert_eq!(control, ctrl.config().turn_control);
    }

    #[tokio::test]
    async fn test_drive_error_propagates() {
        let mut drive = SimDrive::new(GeometryConfig::default(), SimTiming::Instant);
        drive.inject_fault(DriveError::Stalled(MotionKind::Straight));
        let mut ctrl = MotionCtrl::new(drive, ArtemisConfig::default());

        let result = ctrl.straight(100.0, MotionOpts::default()).await;

        assert_eq!(
            result,
            Err(MotionCtrlError::Drive(DriveError::Stalled(MotionKind::Straight)))
        );
        assert_eq!(ctrl.pose(), Pose::default());
        assert_eq!(ctrl.state(), MotionState::Idle);
    }
}
