//! poder CLI - Monte Carlo power simulation
//!
//! Command-line interface for running power studies.

use std::process::ExitCode;

use poder::cli::{run_cli, Args};

fn main() -> ExitCode {
    run_cli(Args::parse())
}
