//! Main tour executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Load the parameters of every module
//!     - Load the path file given on the command line and compile it into a
//!       course
//!     - Run the course against the simulated robot:
//!         - Fast loop: simulation and state estimation
//!         - Slow loop: follower, velocity regulator, current regulator
//!     - Report and save the outcome of the run
//!
//! # Usage
//!
//! ```text
//! tour_exec <path_file>
//! ```
//!
//! The `TOUR_SW_ROOT` environment variable must point at the root of the
//! software, which contains the `params` directory. Sessions are written into
//! `$TOUR_SW_ROOT/sessions`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report
};
use log::{debug, info};
use std::env;

// Internal
use tour_lib::{
    course::{self, compile},
    ctrl_loop::{run_lockstep, run_realtime, Controllers},
    follower,
    params::{LoopTiming, TourExecParams},
    path::PathFile,
    regulators::{CurrentParams, VelocityParams},
    sim::{self, Simulator}
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("tour_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Robot Tour Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: TourExecParams =
        util::params::load("tour_exec.toml").wrap_err("Could not load exec params")?;

    let course_params: course::Params = util::params::load(&exec_params.files.course)
        .wrap_err("Could not load course params")?;
    course_params
        .are_valid()
        .wrap_err("Invalid course params")?;

    let follower_params: follower::Params = util::params::load(&exec_params.files.follower)
        .wrap_err("Could not load follower params")?;
    follower_params
        .agree_with(&course_params)
        .wrap_err("Follower limits do not match the course params")?;
    let velocity_params: VelocityParams = util::params::load(&exec_params.files.velocity_reg)
        .wrap_err("Could not load velocity regulator params")?;
    let current_params: CurrentParams = util::params::load(&exec_params.files.current_reg)
        .wrap_err("Could not load current regulator params")?;
    let sim_params: sim::Params =
        util::params::load(&exec_params.files.sim).wrap_err("Could not load sim params")?;

    info!("Parameters loaded");

    // ---- LOAD PATH ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected a single argument, the path file, found {}",
            args.len() - 1
        ));
    }

    info!("Loading path from \"{}\"", &args[1]);

    let (commands, target_time_s) = PathFile::load(&args[1])
        .and_then(|f| f.into_commands())
        .wrap_err("Failed to load the path file")?;

    // ---- COMPILE COURSE ----

    let course = compile(&commands, target_time_s, &course_params);
    let summary = course.summary();

    info!(
        "Compiled {} commands into {} routes and {} segments",
        commands.len(),
        summary.num_routes,
        summary.num_segments
    );
    info!(
        "Course is {:.1} cm long, to be driven in {:.2} s, ending at ({:.2}, {:.2}) cm\n",
        summary.total_length_cm,
        summary.total_target_time_s,
        summary.destination_cm[0],
        summary.destination_cm[1]
    );

    session.save("course.json", course.clone());
    session.save("course_summary.json", summary);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut controllers = Controllers::new(
        course,
        follower_params,
        velocity_params,
        current_params,
        exec_params.battery_average_len
    );

    let mut sim = Simulator::new(&sim_params);

    let mut archiver = Archiver::from_path(&session, "ctrl_loop.csv")
        .wrap_err("Failed to create the control loop archive")?
        .with_decimation(exec_params.archive_decimation);

    info!("Module initialisation complete\n");

    // ---- RUN ----

    let run_summary = match exec_params.timing {
        LoopTiming::Lockstep => {
            run_lockstep(&mut controllers, &mut sim, &exec_params, Some(&mut archiver))
        }
        LoopTiming::Realtime => {
            run_realtime(&mut controllers, sim, &exec_params, Some(&mut archiver))
                .wrap_err("Failed to run the course")?
        }
    };

    session.save("run_summary.json", run_summary);

    // ---- SHUTDOWN ----

    info!("End of execution");

    session.exit();

    Ok(())
}
