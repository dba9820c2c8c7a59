//! CLI output formatting.
//!
//! This module contains all output formatting functions for the CLI.
//! Extracted to enable testing of output generation.

use serde::Serialize;

use crate::config::PowerConfig;
use crate::error::PowerResult;
use crate::power::{PowerMatrix, PowerSummary, Term};

/// Print version information.
pub fn print_version() {
    println!("poder {}", env!("CARGO_PKG_VERSION"));
}

/// Print help message.
pub fn print_help() {
    println!(
        r"poder - Monte Carlo statistical power simulation for regression designs

USAGE:
    poder <COMMAND> [OPTIONS]

COMMANDS:
    run <study.yaml>            Run a power study
        --seed <N>              Override the configured seed
        --parallel              Distribute outer runs over worker threads
        --json                  Emit machine-readable JSON
        -v, --verbose           Show the full power matrix

    validate <study.yaml>       Validate a study file without running it

    help                        Show this help message
    version                     Show version information

EXAMPLES:
    poder run studies/factorial_40.yaml
    poder run studies/field_correlated.yaml --seed 12345 --parallel
    poder validate studies/factorial_40.yaml

A study file specifies the design (experimental 2x2 factorial or field
bivariate-normal), the true effect sizes for X, Z and the XZ interaction,
noise levels, and the significance testing convention. The report gives
per-term detection frequency (power), mean and spread across outer runs.
"
    );
}

/// Print a human-readable power study report.
///
/// # Arguments
///
/// * `matrix` - The full power matrix
/// * `config` - The configuration that produced it
/// * `verbose` - Whether to print every outer run row
pub fn print_power_report(matrix: &PowerMatrix, config: &PowerConfig, verbose: bool) {
    let summary = matrix.summarize();

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if config.study.name.is_empty() {
        println!("Power study");
    } else {
        println!("Power study: {}", config.study.name);
    }
    println!("Seed: {}", config.reproducibility.seed);
    println!(
        "Runs: {} x {} experiments, {} subjects, alpha {}",
        config.simulations, config.experiments, config.subjects, config.alpha
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    println!("Estimated power (mean ± sd across runs):");
    for term in Term::ALL {
        let s = summary.term(term);
        println!("  {:<4} {:.3} ± {:.3}", term.to_string(), s.mean, s.sd);
    }

    if verbose {
        println!("\nPer-run detection frequencies:");
        for (i, row) in matrix.rows().iter().enumerate() {
            println!(
                "  run {:>3}: x {:.3}  z {:.3}  xz {:.3}",
                i + 1,
                row.x,
                row.z,
                row.xz
            );
        }
    }
}

/// Machine-readable report payload.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    seed: u64,
    simulations: usize,
    experiments: usize,
    subjects: usize,
    alpha: f64,
    summary: PowerSummary,
    matrix: &'a PowerMatrix,
}

/// Render the study result as a JSON document.
///
/// # Errors
///
/// Returns a JSON error if serialization fails.
pub fn render_json(matrix: &PowerMatrix, config: &PowerConfig) -> PowerResult<String> {
    let report = JsonReport {
        seed: config.reproducibility.seed,
        simulations: config.simulations,
        experiments: config.experiments,
        subjects: config.subjects,
        alpha: config.alpha,
        summary: matrix.summarize(),
        matrix,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
