//! # Leak Station
//!
//! Runs one leak test and prints the finished run record as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Simulated station, reference configuration
//! leak_station --position 150 --pressure 2.5 --time 0.1
//!
//! # Site configuration, verbose logging
//! leak_station --config config/station.toml -p 120 -b 3.0 -t 2 -v
//!
//! # JSON logs on stderr
//! leak_station --json -p 150 -b 2.5 -t 0.1
//! ```
//!
//! Ctrl-C requests an operator abort; the run still vents and returns home.
//! The exit code is 0 only for a passed run.

#![deny(warnings)]

use clap::Parser;
use leak_common::config::LogLevel;
use leak_common::run::Outcome;
use leak_common::station::{StationConfig, load_station_config};
use leak_control::{LogRecorder, Station};
use leak_hal::DriverRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Leak Station - air-leakage test station controller
#[derive(Parser, Debug)]
#[command(name = "leak_station")]
#[command(version)]
#[command(about = "Run one air-leakage test and print the run record")]
#[command(long_about = None)]
struct Args {
    /// Station configuration file. Built-in defaults when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HAL driver name
    #[arg(short, long, default_value = "simulation")]
    driver: String,

    /// Target actuator position in mm
    #[arg(short, long)]
    position: f64,

    /// Target pressure in bar
    #[arg(short = 'b', long)]
    pressure: f64,

    /// Inspection time in minutes
    #[arg(short, long)]
    time: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_station_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        },
        None => StationConfig::default(),
    };
    setup_tracing(&args, config.shared.log_level);

    match run(&args, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Leak station failed: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the run passed.
fn run(args: &Args, config: StationConfig) -> Result<bool, Box<dyn std::error::Error>> {
    info!("Leak Station v{} starting...", env!("CARGO_PKG_VERSION"));

    let registry = DriverRegistry::with_builtin_drivers();
    info!("Available drivers: {:?}", registry.list_drivers());

    let station = Arc::new(Station::with_registry(
        config,
        &registry,
        &args.driver,
        Arc::new(LogRecorder),
    )?);

    {
        let station = Arc::clone(&station);
        ctrlc::set_handler(move || {
            info!("Received interrupt signal");
            station.request_abort();
        })?;
    }

    station.start_with(args.position, args.pressure, args.time)?;

    let timeouts = &station.config().timeouts;
    let bound = timeouts.home() * 2
        + timeouts.movement()
        + timeouts.pressure_ramp()
        + timeouts.vent()
        + timeouts.max_pause() * 4
        + Duration::from_secs_f64(args.time.max(0.0) * 60.0);
    let run = station
        .wait_for_completion(bound)
        .ok_or("run did not finish within its configured timeouts")?;

    println!("{}", serde_json::to_string_pretty(&run)?);
    let stats = station.statistics();
    info!(
        "Runs: {} total, {} passed, {} failed, {} aborted",
        stats.total, stats.passed, stats.failed, stats.aborted
    );
    station.shutdown()?;

    info!("Leak Station finished: {}", run.outcome);
    Ok(run.outcome == Outcome::Passed)
}

/// Setup tracing subscriber based on CLI arguments and configuration.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        level
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
