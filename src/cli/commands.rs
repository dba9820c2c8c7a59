//! CLI command handlers.
//!
//! This module contains the execution logic for each CLI command.
//! Extracted to enable comprehensive testing of command behavior.

use std::path::Path;
use std::process::ExitCode;

use crate::config::PowerConfig;
use crate::engine::PowerEngine;

use super::output::{print_help, print_power_report, print_version, render_json};
use super::{Args, Command};

/// Main CLI entry point.
///
/// Dispatches to the appropriate command handler based on parsed arguments.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    match args.command {
        Command::Run {
            config_path,
            seed_override,
            parallel,
            json,
            verbose,
        } => run_study(&config_path, seed_override, parallel, json, verbose),
        Command::Validate { config_path } => validate_study(&config_path),
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Version => {
            print_version();
            ExitCode::SUCCESS
        }
    }
}

/// Run a power study from a YAML file.
///
/// # Arguments
///
/// * `path` - Path to the study YAML file
/// * `seed_override` - Optional seed replacing the configured one
/// * `parallel` - Distribute outer runs over worker threads
/// * `json` - Emit machine-readable JSON instead of the human report
/// * `verbose` - Whether to print the full power matrix
#[must_use]
pub fn run_study(
    path: &Path,
    seed_override: Option<u64>,
    parallel: bool,
    json: bool,
    verbose: bool,
) -> ExitCode {
    let mut config = match PowerConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };

    if let Some(seed) = seed_override {
        config.reproducibility.seed = seed;
    }

    let mut engine = match PowerEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };

    let result = if parallel {
        engine.run_parallel()
    } else {
        engine.run()
    };

    match result {
        Ok(matrix) => {
            if json {
                match render_json(&matrix, engine.config()) {
                    Ok(doc) => println!("{doc}"),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        return ExitCode::from(1);
                    }
                }
            } else {
                print_power_report(&matrix, engine.config(), verbose);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Validate a study YAML file without running it.
#[must_use]
pub fn validate_study(path: &Path) -> ExitCode {
    match PowerConfig::load(path) {
        Ok(config) => {
            println!("OK: {}", path.display());
            println!(
                "  {} x {} experiments, {} subjects",
                config.simulations, config.experiments, config.subjects
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid: {e}");
            ExitCode::from(1)
        }
    }
}
