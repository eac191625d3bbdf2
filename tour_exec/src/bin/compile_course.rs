//! # Offline Course Compiler
//!
//! Compiles a path file into a course and writes it as JSON, so that it can
//! be inspected or loaded by a robot which does not compile at boot.
//!
//! ```text
//! compile_course <path_file> [output_file]
//! ```
//!
//! The output defaults to `course.json`. Course parameters are loaded from
//! `$TOUR_SW_ROOT/params/course.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result
};
use std::{env, fs::File, io::BufWriter};
use tour_lib::{
    course::{compile, Params},
    path::PathFile
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const DEFAULT_OUTPUT: &str = "course.json";

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let args: Vec<String> = env::args().collect();
    let (path_file, output) = match args.len() {
        2 => (&args[1], DEFAULT_OUTPUT),
        3 => (&args[1], args[2].as_str()),
        n => {
            return Err(eyre!(
                "Expected a path file and an optional output file, found {} arguments",
                n - 1
            ))
        }
    };

    let params: Params =
        util::params::load("course.toml").wrap_err("Could not load course params")?;
    params.are_valid().wrap_err("Invalid course params")?;

    let (commands, target_time_s) = PathFile::load(path_file)
        .and_then(|f| f.into_commands())
        .wrap_err_with(|| format!("Failed to load the path file {}", path_file))?;

    let course = compile(&commands, target_time_s, &params);
    let summary = course.summary();

    let writer = BufWriter::new(
        File::create(output).wrap_err_with(|| format!("Could not create {}", output))?
    );
    serde_json::to_writer_pretty(writer, &course).wrap_err("Could not write the course")?;

    println!(
        "{} routes, {} segments, {:.1} cm in {:.2} s, destination ({:.2}, {:.2}) cm",
        summary.num_routes,
        summary.num_segments,
        summary.total_length_cm,
        summary.total_target_time_s,
        summary.destination_cm[0],
        summary.destination_cm[1]
    );
    for (i, (length, time)) in summary
        .route_lengths_cm
        .iter()
        .zip(summary.route_times_s.iter())
        .enumerate()
    {
        println!("    route {}: {:.1} cm, {:.2} s", i, length, time);
    }
    println!("Course written to {}", output);

    Ok(())
}
