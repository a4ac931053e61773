//! # Artemis library.
//!
//! Dead-reckoning motion control for the Artemis robot, plus the simulated
//! drive base, telemetry and mission script runner built on top of it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Robot configuration - geometry, PID gains and motion ceilings
pub mod config;

/// Drive base interface - what the controller needs from the hardware
pub mod drive;

/// Field geometry - headings, distances and dead reckoning maths
pub mod geometry;

/// Mission runner - executes timed scripts of motion commands
pub mod mission;

/// Motion control module - turns waypoints into timed turn/straight motions
pub mod motion_ctrl;

/// Pose tracker - the robot's estimated position
pub mod pose;

/// Simulated drive base - replays motions without hardware
pub mod sim;

/// Telemetry - periodic sampling of device state during a mission
pub mod telemetry;
