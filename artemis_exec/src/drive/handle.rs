//! Handles to in-progress motions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use tokio::sync::oneshot;

use super::{DriveError, MotionKind};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The controller's side of an in-progress motion.
///
/// Await `wait` for the motion to finish, or `cancel` it to ask the drive to
/// stop where it is. Dropping the handle also asks the drive to stop.
#[derive(Debug)]
pub struct MotionHandle {
    kind: MotionKind,
    done_rx: oneshot::Receiver<Result<(), DriveError>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

/// The drive's side of an in-progress motion.
///
/// The drive reports the end of the motion through `complete`, and watches
/// `stop_requested` to learn when the controller no longer wants it.
#[derive(Debug)]
pub struct MotionLink {
    kind: MotionKind,
    done_tx: oneshot::Sender<Result<(), DriveError>>,
    stop_rx: oneshot::Receiver<()>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a connected handle/link pair for a new motion.
pub fn motion_channel(kind: MotionKind) -> (MotionHandle, MotionLink) {
    let (done_tx, done_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel();

    (
        MotionHandle {
            kind,
            done_rx,
            stop_tx: Some(stop_tx),
        },
        MotionLink {
            kind,
            done_tx,
            stop_rx,
        },
    )
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionHandle {
    /// A handle for a motion which has already finished with `result`.
    pub fn finished(kind: MotionKind, result: Result<(), DriveError>) -> Self {
        let (handle, link) = motion_channel(kind);
        link.complete(result);
        handle
    }

    pub fn kind(&self) -> MotionKind {
        self.kind
    }

    /// Wait for the drive to report the end of the motion.
    ///
    /// Cancel safe: if this future is dropped the motion keeps going until
    /// the handle is cancelled or dropped.
    pub async fn wait(&mut self) -> Result<(), DriveError> {
        match (&mut self.done_rx).await {
            Ok(result) => result,
            Err(_) => Err(DriveError::MotionAbandoned(self.kind)),
        }
    }

    /// Ask the drive to stop the motion.
    ///
    /// Best effort: the robot may keep moving briefly before the stop takes
    /// effect.
    pub fn cancel(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // The drive may have finished and dropped its link already
            let _ = tx.send(());
        }
    }
}

impl MotionLink {
    pub fn kind(&self) -> MotionKind {
        self.kind
    }

    /// Resolves once the controller has cancelled or dropped the motion.
    pub async fn stop_requested(&mut self) {
        // A dropped sender means the handle is gone, which also means stop
        let _ = (&mut self.stop_rx).await;
    }

    /// Report the end of the motion.
    pub fn complete(self, result: Result<(), DriveError>) {
        // Nobody listening is fine, the controller has moved on
        let _ = self.done_tx.send(result);
    }
}
