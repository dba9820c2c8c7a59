//! CLI argument parsing.
//!
//! This module provides the argument parser for the poder CLI.
//! Extracted to enable comprehensive testing of argument parsing logic.

use std::path::PathBuf;

/// CLI arguments container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// The command to execute.
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a power study
    Run {
        /// Path to the study YAML file.
        config_path: PathBuf,
        /// Optional seed override.
        seed_override: Option<u64>,
        /// Distribute outer runs over worker threads.
        parallel: bool,
        /// Emit machine-readable JSON instead of the human report.
        json: bool,
        /// Enable verbose output.
        verbose: bool,
    },
    /// Validate a study YAML file without running it
    Validate {
        /// Path to the study YAML file.
        config_path: PathBuf,
    },
    /// Show help
    Help,
    /// Show version
    Version,
}

impl Args {
    /// Parse command-line arguments from an iterator.
    ///
    /// This method is testable as it accepts any iterator of strings,
    /// not just `std::env::args()`.
    #[must_use]
    pub fn parse_from<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse_from_vec(&args)
    }

    /// Parse command-line arguments from the environment.
    #[must_use]
    pub fn parse() -> Self {
        Self::parse_from(std::env::args())
    }

    /// Internal parsing from a vector of strings.
    fn parse_from_vec(args: &[String]) -> Self {
        if args.len() < 2 {
            return Self {
                command: Command::Help,
            };
        }

        match args[1].as_str() {
            "run" => Self::parse_run(&args[2..]),
            "validate" => Self::parse_validate(&args[2..]),
            "version" | "--version" | "-V" => Self {
                command: Command::Version,
            },
            _ => Self {
                command: Command::Help,
            },
        }
    }

    fn parse_run(rest: &[String]) -> Self {
        let mut config_path = None;
        let mut seed_override = None;
        let mut parallel = false;
        let mut json = false;
        let mut verbose = false;

        let mut i = 0;
        while i < rest.len() {
            match rest[i].as_str() {
                "--seed" => {
                    if let Some(value) = rest.get(i + 1) {
                        seed_override = value.parse::<u64>().ok();
                        i += 1;
                    }
                }
                "--parallel" => parallel = true,
                "--json" => json = true,
                "-v" | "--verbose" => verbose = true,
                other if !other.starts_with('-') && config_path.is_none() => {
                    config_path = Some(PathBuf::from(other));
                }
                _ => {}
            }
            i += 1;
        }

        config_path.map_or(
            Self {
                command: Command::Help,
            },
            |config_path| Self {
                command: Command::Run {
                    config_path,
                    seed_override,
                    parallel,
                    json,
                    verbose,
                },
            },
        )
    }

    fn parse_validate(rest: &[String]) -> Self {
        rest.iter().find(|a| !a.starts_with('-')).map_or(
            Self {
                command: Command::Help,
            },
            |path| Self {
                command: Command::Validate {
                    config_path: PathBuf::from(path),
                },
            },
        )
    }
}
