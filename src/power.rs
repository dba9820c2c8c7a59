//! Power estimate containers.
//!
//! A power study produces a matrix of detection frequencies: one row per
//! outer simulation run, one column per model term (X, Z, XZ). The matrix
//! is the artifact handed to callers for plotting or reporting; the
//! summary reduces it to per-term mean, spread, and a 95% interval.

use serde::{Deserialize, Serialize};

/// A model term whose detection frequency is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// Main effect of X.
    X,
    /// Main effect of Z.
    Z,
    /// XZ interaction.
    Interaction,
}

impl Term {
    /// All terms in column order.
    pub const ALL: [Self; 3] = [Self::X, Self::Z, Self::Interaction];

    /// Column index in the power matrix.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Z => 1,
            Self::Interaction => 2,
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Z => write!(f, "z"),
            Self::Interaction => write!(f, "xz"),
        }
    }
}

/// Detection frequencies from one outer simulation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerRow {
    /// Detection frequency for the main effect of X.
    pub x: f64,
    /// Detection frequency for the main effect of Z.
    pub z: f64,
    /// Detection frequency for the XZ interaction.
    pub xz: f64,
}

impl PowerRow {
    /// The three frequencies in term order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.x, self.z, self.xz]
    }

    /// Frequency for one term.
    #[must_use]
    pub const fn term(&self, term: Term) -> f64 {
        match term {
            Term::X => self.x,
            Term::Z => self.z,
            Term::Interaction => self.xz,
        }
    }
}

/// Detection frequencies over all outer simulation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerMatrix {
    rows: Vec<PowerRow>,
}

impl PowerMatrix {
    /// Wrap per-run rows into a matrix.
    #[must_use]
    pub fn new(rows: Vec<PowerRow>) -> Self {
        Self { rows }
    }

    /// Per-run rows, in run order.
    #[must_use]
    pub fn rows(&self) -> &[PowerRow] {
        &self.rows
    }

    /// Mean detection frequency for one term across runs.
    #[must_use]
    pub fn mean(&self, term: Term) -> f64 {
        if self.rows.is_empty() {
            return f64::NAN;
        }
        self.rows.iter().map(|r| r.term(term)).sum::<f64>() / self.rows.len() as f64
    }

    /// Sample standard deviation of the per-run frequency for one term.
    ///
    /// This is the variability of the power estimate itself, the quantity
    /// the outer simulation loop exists to expose.
    #[must_use]
    pub fn sd(&self, term: Term) -> f64 {
        let n = self.rows.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean(term);
        let ss = self
            .rows
            .iter()
            .map(|r| (r.term(term) - mean).powi(2))
            .sum::<f64>();
        (ss / (n - 1) as f64).sqrt()
    }

    /// Reduce to a per-term summary.
    #[must_use]
    pub fn summarize(&self) -> PowerSummary {
        PowerSummary::from_matrix(self)
    }
}

/// Mean, spread, and 95% interval of one term's power estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TermSummary {
    /// Mean detection frequency across outer runs.
    pub mean: f64,
    /// Sample standard deviation across outer runs.
    pub sd: f64,
    /// 95% normal interval around the mean (`mean ± 1.96 sd`).
    pub interval: (f64, f64),
}

impl TermSummary {
    fn from_stats(mean: f64, sd: f64) -> Self {
        let half = 1.96 * sd;
        Self {
            mean,
            sd,
            interval: (mean - half, mean + half),
        }
    }
}

/// Per-term summary of a power matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerSummary {
    /// Summary for the main effect of X.
    pub x: TermSummary,
    /// Summary for the main effect of Z.
    pub z: TermSummary,
    /// Summary for the XZ interaction.
    pub xz: TermSummary,
    /// Number of outer runs summarized.
    pub runs: usize,
}

impl PowerSummary {
    /// Summarize a power matrix.
    #[must_use]
    pub fn from_matrix(matrix: &PowerMatrix) -> Self {
        Self {
            x: TermSummary::from_stats(matrix.mean(Term::X), matrix.sd(Term::X)),
            z: TermSummary::from_stats(matrix.mean(Term::Z), matrix.sd(Term::Z)),
            xz: TermSummary::from_stats(
                matrix.mean(Term::Interaction),
                matrix.sd(Term::Interaction),
            ),
            runs: matrix.rows().len(),
        }
    }

    /// Summary for one term.
    #[must_use]
    pub const fn term(&self, term: Term) -> TermSummary {
        match term {
            Term::X => self.x,
            Term::Z => self.z,
            Term::Interaction => self.xz,
        }
    }
}
