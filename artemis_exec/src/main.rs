//! Main Artemis executable entry point.
//!
//! Runs a mission script against the simulated drive base:
//!
//! ```text
//! artemis_exec <script> [run duration s]
//! ```
//!
//! The drive's command table, the final pose and the sampled telemetry are
//! logged at the end of the run, and the telemetry is archived in the
//! session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info};
use std::env;
use std::time::Duration;

// Internal
use artemis_lib::{
    config::ArtemisConfig,
    mission::{Mission, DEFAULT_RUN_DURATION},
    motion_ctrl::MotionCtrl,
    sim::{SimDrive, SimTiming},
    telemetry::Sampler,
};
use util::{
    archive::{Archived, Archiver},
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
#[tokio::main]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("artemis_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Artemis Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let config = ArtemisConfig::load("artemis.toml").wrap_err("Could not load Artemis params")?;
    debug!("Config: {:#?}", config);

    // ---- LOAD MISSION ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let (script_path, run_duration) = match args.len() {
        2 => (&args[1], DEFAULT_RUN_DURATION),
        3 => {
            let secs: f64 = args[2]
                .parse()
                .wrap_err_with(|| format!("Invalid run duration \"{}\"", args[2]))?;
            let duration = Duration::try_from_secs_f64(secs)
                .wrap_err_with(|| format!("Invalid run duration of {} s", secs))?;
            (&args[1], duration)
        }
        n => {
            return Err(eyre!(
                "Expected a script path and optional run duration, found {} arguments",
                n - 1
            ))
        }
    };

    info!("Loading mission from \"{}\"", script_path);
    let mission = Mission::load(script_path)
        .wrap_err("Failed to load mission")?
        .with_run_duration(run_duration);

    // ---- INITIALISE MODULES ----

    let drive = SimDrive::new(config.geometry, SimTiming::Profiled { time_scale: 1.0 });
    let mut sampler = Sampler::default();
    sampler.add_source(drive.probe());

    let mut ctrl = MotionCtrl::new(drive, config);
    info!("Module initialisation complete\n");

    // ---- RUN ----

    info!("Starting mission of {} commands", mission.num_cmds());
    let report = sampler
        .run_with_telemetry(mission.run(&mut ctrl))
        .await
        .wrap_err("Mission failed")?;

    // ---- REPORT ----

    info!("Mission report: {:?}", report);
    info!("Controller report: {:?}", ctrl.report());
    info!("Final pose: ({:.1}, {:.1})", ctrl.x(), ctrl.y());
    info!("Drive commands:\n{}", ctrl.drive().table());

    let mut archiver =
        Archiver::from_path(&session, "telemetry.csv").wrap_err("Failed to open telemetry archive")?;
    sampler
        .write(&mut archiver)
        .wrap_err("Failed to archive telemetry")?;

    let report_path = session.arch_root.join("mission_report.json");
    let report_json =
        serde_json::to_string_pretty(&report).wrap_err("Failed to serialise the mission report")?;
    std::fs::write(&report_path, report_json)
        .wrap_err_with(|| format!("Failed to write {:?}", report_path))?;

    sampler.print().wrap_err("Failed to print telemetry")?;

    info!("End of session");

    Ok(())
}
