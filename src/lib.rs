//! # poder
//!
//! Monte Carlo statistical power simulation for regression designs.
//!
//! Estimates the probability of detecting main effects and interaction
//! terms in multiple linear regression by repeated simulation: synthesize
//! a dataset under a known ground-truth model, fit a regression, record
//! which coefficients cross the significance threshold, and aggregate
//! detection frequencies over many repetitions.
//!
//! Supports experimental (balanced 2x2 factorial) and field (continuous
//! bivariate-normal) regressor generation, repeated-measures designs with
//! within-subject correlation, errors-in-variables measurement noise, and
//! simultaneous (marginal t) versus sequential (type-I F) testing.
//!
//! ## Example
//!
//! ```rust
//! use poder::prelude::*;
//!
//! let config = PowerConfig::builder()
//!     .seed(42)
//!     .subjects(40)
//!     .simulations(5)
//!     .experiments(50)
//!     .effects(0.5, 0.5, 0.5)
//!     .noise_sd(1.0)
//!     .build();
//!
//! let mut engine = PowerEngine::new(config).unwrap();
//! let matrix = engine.run().unwrap();
//! assert_eq!(matrix.rows().len(), 5);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops,  // Manual Horner's method is intentional
    clippy::imprecise_flops,   // Numerical code choices are intentional
    clippy::too_many_lines,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
    clippy::needless_range_loop,   // Sometimes range loops are clearer
)]

pub mod cli;
pub mod config;
pub mod design;
pub mod engine;
pub mod error;
pub mod fit;
pub mod power;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{
        DesignMode, Effects, PowerConfig, PowerConfigBuilder, RepeatedFactors, TestingMode,
    };
    pub use crate::engine::rng::PowerRng;
    pub use crate::engine::PowerEngine;
    pub use crate::error::{PowerError, PowerResult};
    pub use crate::power::{PowerMatrix, PowerSummary, Term};
}

/// Re-export for public API
pub use error::{PowerError, PowerResult};
