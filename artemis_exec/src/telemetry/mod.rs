//! # Telemetry sampler
//!
//! Periodically samples device state while a mission runs. The sampler is
//! raced against the mission future: it keeps sampling until the mission
//! finishes, then stops. It only reads state and never drives actuators, so
//! it is safe to interleave with the motion controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

// Internal
use util::archive::{ArchiveError, Archived, Archiver, Writer};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Printed before the CSV block so logs can be cut out of console output.
pub const START_TOKEN: &str = "<START LOGS>";

/// Printed after the CSV block.
pub const END_TOKEN: &str = "<END LOGS>";

/// Default sampling period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something whose state can be sampled.
pub trait TelemetrySource: Send + Sync {
    /// Sample every parameter of the source, stamped with `time_s`.
    fn sample(&self, time_s: f64) -> Vec<TelemetryEntry>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One sampled value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEntry {
    pub device: String,

    /// Seconds since sampling started
    pub time: f64,

    pub parameter: String,

    pub value: f64,
}

/// Collects telemetry entries from a set of sources at a fixed interval.
pub struct Sampler {
    sources: Vec<Box<dyn TelemetrySource>>,
    interval: Duration,
    entries: Vec<TelemetryEntry>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TelemetryEntry {
    pub fn new(device: &str, time: f64, parameter: &str, value: f64) -> Self {
        Self {
            device: device.to_string(),
            time,
            parameter: parameter.to_string(),
            value,
        }
    }
}

impl Sampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            sources: Vec::new(),
            interval,
            entries: Vec::new(),
        }
    }

    pub fn add_source<S: TelemetrySource + 'static>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }

    pub fn entries(&self) -> &[TelemetryEntry] {
        &self.entries
    }

    /// Run `task` to completion, sampling all sources every interval while it
    /// runs, and return the task's output.
    ///
    /// The first sample is taken immediately.
    pub async fn run_with_telemetry<F: Future>(&mut self, task: F) -> F::Output {
        let start = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(task);

        debug!("Telemetry sampling every {:?}", self.interval);

        let output = loop {
            tokio::select! {
                biased;
                out = &mut task => break out,
                _ = ticker.tick() => {
                    let time_s = start.elapsed().as_secs_f64();
                    trace!("Telemetry sample at {:.3} s", time_s);
                    for source in &self.sources {
                        self.entries.extend(source.sample(time_s));
                    }
                }
            }
        };

        debug!("Telemetry stopped with {} entries", self.entries.len());

        output
    }

    /// Render all entries as CSV with a `device,time,parameter,value` header.
    pub fn to_csv(&self) -> Result<String, ArchiveError> {
        let mut w = Writer::from_writer(Vec::new());

        // Write the header explicitly so it's there even with no entries
        w.write_record(["device", "time", "parameter", "value"])
            .map_err(ArchiveError::CsvError)?;

        for entry in &self.entries {
            w.write_record(&[
                entry.device.clone(),
                entry.time.to_string(),
                entry.parameter.clone(),
                entry.value.to_string(),
            ])
            .map_err(ArchiveError::CsvError)?;
        }

        let bytes = w
            .into_inner()
            .map_err(|e| ArchiveError::FileError(e.into_error()))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Print all entries to stdout between the start and end tokens.
    pub fn print(&self) -> Result<(), ArchiveError> {
        println!("{}", START_TOKEN);
        print!("{}", self.to_csv()?);
        println!("{}", END_TOKEN);
        Ok(())
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl Archived for Sampler {
    fn write(&mut self, archiver: &mut Archiver) -> Result<(), ArchiveError> {
        for entry in &self.entries {
            archiver.serialise(entry)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
