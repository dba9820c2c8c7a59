//! Model fitting for simulated experiments.
//!
//! The engine fits a regression of the response on {X, Z, XZ} every inner
//! iteration. Which fit runs is decided once per configuration and held as
//! a [`FitStrategy`], not re-checked inside the loop:
//!
//! - ordinary least squares with marginal (simultaneous) t-tests,
//! - ordinary least squares with sequential type-I F-tests, or
//! - a random-intercept mixed model when the design has repeated measures.

pub mod dist;
pub mod mixed;
pub mod ols;

use serde::{Deserialize, Serialize};

use crate::design::{GroupingPlan, SimulatedDataset};
use crate::error::PowerResult;

/// Per-term p-values from one fitted model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TermTests {
    /// p-value for the main effect of X.
    pub x: f64,
    /// p-value for the main effect of Z.
    pub z: f64,
    /// p-value for the XZ interaction.
    pub xz: f64,
}

impl TermTests {
    /// The three p-values in term order (X, Z, XZ).
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.x, self.z, self.xz]
    }

    /// Whether all three p-values are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.z.is_finite() && self.xz.is_finite()
    }
}

/// Fitting strategy, selected once per configuration.
#[derive(Debug, Clone)]
pub enum FitStrategy {
    /// OLS; each term tested controlling for the other two.
    OlsSimultaneous,
    /// OLS; terms tested in order X, Z, XZ via type-I sums of squares.
    OlsSequential,
    /// Random-intercept mixed model over the given subject grouping.
    RandomIntercept {
        /// Which rows belong to which subject.
        grouping: GroupingPlan,
    },
}

impl FitStrategy {
    /// Fit one simulated dataset and return per-term p-values.
    ///
    /// # Errors
    ///
    /// Returns a fitting error for rank-deficient designs or non-converged
    /// variance components.
    pub fn fit(&self, data: &SimulatedDataset) -> PowerResult<TermTests> {
        match self {
            Self::OlsSimultaneous => ols::simultaneous_tests(data),
            Self::OlsSequential => ols::sequential_tests(data),
            Self::RandomIntercept { grouping } => mixed::fit_random_intercept(data, grouping),
        }
    }
}
