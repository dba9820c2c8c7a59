//! Regressor synthesis for simulated experiments.
//!
//! Builds the predictor columns for one simulated dataset: a balanced 2x2
//! dummy-coded factorial (experimental studies) or a bivariate-normal draw
//! (field studies), the interaction column, optional errors-in-variables
//! measurement noise, and the residual covariance structure implied by
//! repeated-measures designs.
//!
//! Column conventions:
//! - Experimental columns are standardized to mean 0, unit variance.
//! - Field columns are mean-centered only; caller-supplied raw columns are
//!   never rescaled because their scale may be meaningful.
//! - The interaction column is the elementwise product of the centered
//!   inputs and is *not* re-centered afterwards; it inherits whatever mean
//!   the product naturally has.

use nalgebra::{DMatrix, DVector};

use crate::config::RepeatedFactors;
use crate::engine::rng::PowerRng;

/// One simulated realization: a response and the observed predictor columns.
///
/// Created per inner-experiment iteration and discarded after the fit.
#[derive(Debug, Clone)]
pub struct SimulatedDataset {
    /// Response values.
    pub y: Vec<f64>,
    /// First predictor (centered, possibly noisy).
    pub x: Vec<f64>,
    /// Second predictor (centered, possibly noisy).
    pub z: Vec<f64>,
    /// Interaction column, the elementwise product of `x` and `z`.
    pub xz: Vec<f64>,
}

impl SimulatedDataset {
    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Subtract the column mean in place.
pub fn center(column: &mut [f64]) {
    let n = column.len();
    if n == 0 {
        return;
    }
    let mean = column.iter().sum::<f64>() / n as f64;
    for v in column.iter_mut() {
        *v -= mean;
    }
}

/// Center and rescale to unit sample variance in place.
///
/// Zero-variance input is a configuration precondition; callers validate
/// degenerate columns before the simulation loop starts.
pub fn standardize(column: &mut [f64]) {
    center(column);
    let n = column.len();
    if n < 2 {
        return;
    }
    let var = column.iter().map(|v| v * v).sum::<f64>() / (n - 1) as f64;
    let sd = var.sqrt();
    if sd > 0.0 {
        for v in column.iter_mut() {
            *v /= sd;
        }
    }
}

/// Elementwise product of two columns.
#[must_use]
pub fn interaction(x: &[f64], z: &[f64]) -> Vec<f64> {
    x.iter().zip(z.iter()).map(|(a, b)| a * b).collect()
}

/// Sample variance of a column.
#[must_use]
pub fn sample_variance(column: &[f64]) -> f64 {
    let n = column.len();
    if n < 2 {
        return 0.0;
    }
    let mean = column.iter().sum::<f64>() / n as f64;
    column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Where the predictor columns for one experiment come from.
///
/// Resolved once per configuration; `draw` runs every inner iteration.
#[derive(Debug, Clone)]
pub enum RegressorSource {
    /// Balanced 2x2 dummy-coded factorial, `cell_size` subjects per cell,
    /// columns standardized. The design is fixed; draws are deterministic.
    Factorial {
        /// Subjects per cell (`subjects / 4`).
        cell_size: usize,
    },
    /// Bivariate normal draw with the given covariance, columns centered.
    Bivariate {
        /// Observations per draw.
        n: usize,
        /// Cholesky factor of the 2x2 covariance: `[l11, l21, l22]`.
        chol: [f64; 3],
    },
    /// Caller-supplied raw columns; the random draw is bypassed entirely
    /// but centering still applies. Never rescaled.
    Raw {
        /// Raw first predictor.
        x: Vec<f64>,
        /// Raw second predictor.
        z: Vec<f64>,
    },
}

impl RegressorSource {
    /// Produce the predictor columns for one experiment.
    pub fn draw(&self, rng: &mut PowerRng) -> (Vec<f64>, Vec<f64>) {
        match self {
            Self::Factorial { cell_size } => factorial_columns(*cell_size),
            Self::Bivariate { n, chol } => {
                let [l11, l21, l22] = *chol;
                let mut x = Vec::with_capacity(*n);
                let mut z = Vec::with_capacity(*n);
                for _ in 0..*n {
                    let e1 = rng.standard_normal();
                    let e2 = rng.standard_normal();
                    x.push(l11 * e1);
                    z.push(l21 * e1 + l22 * e2);
                }
                center(&mut x);
                center(&mut z);
                (x, z)
            }
            Self::Raw { x, z } => {
                let mut x = x.clone();
                let mut z = z.clone();
                center(&mut x);
                center(&mut z);
                (x, z)
            }
        }
    }
}

/// Standardized dummy columns for the balanced 2x2 factorial.
///
/// Cells are laid out in blocks `(x=0,z=0), (x=0,z=1), (x=1,z=0), (x=1,z=1)`
/// with `cell_size` rows each.
fn factorial_columns(cell_size: usize) -> (Vec<f64>, Vec<f64>) {
    let n = 4 * cell_size;
    let mut x = vec![0.0; n];
    let mut z = vec![0.0; n];
    for cell in 0..4 {
        let x_level = (cell / 2) as f64;
        let z_level = (cell % 2) as f64;
        for i in 0..cell_size {
            x[cell * cell_size + i] = x_level;
            z[cell * cell_size + i] = z_level;
        }
    }
    standardize(&mut x);
    standardize(&mut z);
    (x, z)
}

/// Add iid Gaussian measurement noise to an observed column and re-center.
pub fn add_measurement_noise(column: &mut [f64], sd: f64, rng: &mut PowerRng) {
    for v in column.iter_mut() {
        *v += rng.normal(0.0, sd);
    }
    center(column);
}

/// Which observations belong to which subject.
///
/// In a between-subjects design every observation is its own subject; a
/// repeated factor folds pairs (or all four cells) of observations onto
/// one subject.
#[derive(Debug, Clone)]
pub struct GroupingPlan {
    /// Subject index for each observation row.
    pub subject_of: Vec<usize>,
    /// Number of distinct subjects.
    pub n_subjects: usize,
}

impl GroupingPlan {
    /// Build the grouping implied by a repeated-measures configuration.
    ///
    /// `subjects` must be a positive multiple of 4; the configuration layer
    /// enforces that before the plan is built. Rows follow the factorial
    /// cell layout of [`RegressorSource::Factorial`].
    #[must_use]
    pub fn new(subjects: usize, repeated: RepeatedFactors) -> Self {
        let m = subjects / 4;
        let mut subject_of = vec![0usize; subjects];
        let n_subjects = match repeated {
            RepeatedFactors::None => {
                for (row, s) in subject_of.iter_mut().enumerate() {
                    *s = row;
                }
                subjects
            }
            RepeatedFactors::X => {
                // Each subject observed at both X levels, same Z cell.
                for cell in 0..4 {
                    let z_level = cell % 2;
                    for i in 0..m {
                        subject_of[cell * m + i] = z_level * m + i;
                    }
                }
                2 * m
            }
            RepeatedFactors::Z => {
                // Each subject observed at both Z levels, same X cell.
                for cell in 0..4 {
                    let x_level = cell / 2;
                    for i in 0..m {
                        subject_of[cell * m + i] = x_level * m + i;
                    }
                }
                2 * m
            }
            RepeatedFactors::Both => {
                // Each subject observed in all four cells.
                for cell in 0..4 {
                    for i in 0..m {
                        subject_of[cell * m + i] = i;
                    }
                }
                m
            }
        };
        Self {
            subject_of,
            n_subjects,
        }
    }

    /// Whether any factor is actually repeated within subjects.
    #[must_use]
    pub fn has_repeats(&self) -> bool {
        self.n_subjects < self.subject_of.len()
    }
}

/// Residual correlation matrix for a repeated-measures design.
///
/// `C[i][j] = 1` on the diagonal, `scor` when rows `i != j` share a
/// subject, zero otherwise. With the factorial cell layout this is the
/// block-Kronecker structure of paired observations; the marginal variance
/// stays 1 so the noise scale is carried entirely by `noise_sd`.
#[must_use]
pub fn correlation_matrix(grouping: &GroupingPlan, scor: f64) -> DMatrix<f64> {
    let n = grouping.subject_of.len();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else if grouping.subject_of[i] == grouping.subject_of[j] {
            scor
        } else {
            0.0
        }
    })
}

/// Residual noise model, resolved once per configuration.
#[derive(Debug, Clone)]
pub enum NoiseModel {
    /// Independent residuals, `noise_sd^2 I`.
    Iid {
        /// Residual standard deviation.
        sd: f64,
        /// Observations per draw.
        n: usize,
    },
    /// Correlated residuals, `noise_sd^2 C` with `C = L L^T` precomputed.
    Structured {
        /// Residual standard deviation.
        sd: f64,
        /// Lower Cholesky factor of the correlation matrix.
        chol: DMatrix<f64>,
    },
}

impl NoiseModel {
    /// Draw one residual vector.
    #[must_use]
    pub fn sample(&self, rng: &mut PowerRng) -> Vec<f64> {
        match self {
            Self::Iid { sd, n } => (0..*n).map(|_| rng.normal(0.0, *sd)).collect(),
            Self::Structured { sd, chol } => {
                let z = DVector::from_vec(rng.standard_normal_vec(chol.nrows()));
                let e = chol * z;
                e.iter().map(|v| sd * v).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_factorial_columns_balanced() {
        let (x, z) = factorial_columns(10);
        assert_eq!(x.len(), 40);

        // Standardized: mean 0, unit sample variance
        assert!(x.iter().sum::<f64>().abs() < 1e-10);
        assert!(z.iter().sum::<f64>().abs() < 1e-10);
        assert!((sample_variance(&x) - 1.0).abs() < 1e-10);
        assert!((sample_variance(&z) - 1.0).abs() < 1e-10);

        // Orthogonal by construction
        let dot: f64 = x.iter().zip(z.iter()).map(|(a, b)| a * b).sum();
        assert!(dot.abs() < 1e-10);
    }

    #[test]
    fn test_interaction_not_recentered() {
        // Product of centered columns keeps its natural mean
        let mut x = vec![1.0, 2.0, 3.0, 10.0];
        let mut z = vec![4.0, 1.0, 7.0, 2.0];
        center(&mut x);
        center(&mut z);
        let xz = interaction(&x, &z);
        let mean = xz.iter().sum::<f64>() / xz.len() as f64;
        assert!(
            mean.abs() > 1e-6,
            "test vectors should produce a nonzero product mean"
        );
    }

    #[test]
    fn test_bivariate_covariance() {
        let mut rng = PowerRng::new(42);
        let var_x: f64 = 1.0;
        let var_z: f64 = 1.0;
        let cov = 0.6;
        let l11 = var_x.sqrt();
        let l21 = cov / l11;
        let l22 = (var_z - l21 * l21).sqrt();
        let source = RegressorSource::Bivariate {
            n: 50_000,
            chol: [l11, l21, l22],
        };
        let (x, z) = source.draw(&mut rng);

        let sxz: f64 = x.iter().zip(z.iter()).map(|(a, b)| a * b).sum::<f64>()
            / (x.len() - 1) as f64;
        assert!((sample_variance(&x) - var_x).abs() < 0.05);
        assert!((sample_variance(&z) - var_z).abs() < 0.05);
        assert!((sxz - cov).abs() < 0.05, "empirical cov {sxz}");
    }

    #[test]
    fn test_raw_source_centers_without_rescaling() {
        let source = RegressorSource::Raw {
            x: vec![10.0, 20.0, 30.0, 40.0],
            z: vec![1.0, 2.0, 3.0, 4.0],
        };
        let mut rng = PowerRng::new(1);
        let (x, z) = source.draw(&mut rng);
        assert!(x.iter().sum::<f64>().abs() < 1e-10);
        // Spread preserved: raw scale is meaningful
        assert!((sample_variance(&x) - sample_variance(&[10.0, 20.0, 30.0, 40.0])).abs() < 1e-10);
        assert!((sample_variance(&z) - sample_variance(&[1.0, 2.0, 3.0, 4.0])).abs() < 1e-10);
    }

    #[test]
    fn test_grouping_between_subjects() {
        let plan = GroupingPlan::new(16, RepeatedFactors::None);
        assert_eq!(plan.n_subjects, 16);
        assert!(!plan.has_repeats());
    }

    #[test]
    fn test_grouping_repeated_x() {
        let plan = GroupingPlan::new(16, RepeatedFactors::X);
        assert_eq!(plan.n_subjects, 8);
        assert!(plan.has_repeats());
        // Row i of cell (x=0,z=0) shares a subject with row i of cell (x=1,z=0)
        let m = 4;
        for i in 0..m {
            assert_eq!(plan.subject_of[i], plan.subject_of[2 * m + i]);
            assert_ne!(plan.subject_of[i], plan.subject_of[m + i]);
        }
    }

    #[test]
    fn test_grouping_repeated_both() {
        let plan = GroupingPlan::new(16, RepeatedFactors::Both);
        assert_eq!(plan.n_subjects, 4);
        let m = 4;
        for i in 0..m {
            let s = plan.subject_of[i];
            for cell in 1..4 {
                assert_eq!(plan.subject_of[cell * m + i], s);
            }
        }
    }

    #[test]
    fn test_correlation_matrix_structure() {
        let plan = GroupingPlan::new(8, RepeatedFactors::X);
        let c = correlation_matrix(&plan, 0.4);
        for i in 0..8 {
            assert!((c[(i, i)] - 1.0).abs() < 1e-12);
        }
        // Paired rows carry the within-subject correlation
        assert!((c[(0, 4)] - 0.4).abs() < 1e-12);
        assert!((c[(0, 1)]).abs() < 1e-12);
        // Symmetric
        for i in 0..8 {
            for j in 0..8 {
                assert!((c[(i, j)] - c[(j, i)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_structured_noise_marginal_variance() {
        let plan = GroupingPlan::new(40, RepeatedFactors::X);
        let c = correlation_matrix(&plan, 0.5);
        let chol = nalgebra::Cholesky::new(c)
            .map(|ch| ch.l())
            .unwrap();
        let model = NoiseModel::Structured { sd: 2.0, chol };

        let mut rng = PowerRng::new(7);
        let mut all = Vec::new();
        for _ in 0..2000 {
            all.extend(model.sample(&mut rng));
        }
        let var = sample_variance(&all);
        assert!((var - 4.0).abs() < 0.2, "marginal variance {var}");
    }

    proptest! {
        #[test]
        fn prop_center_zeroes_mean(values in proptest::collection::vec(-1e3f64..1e3, 2..64)) {
            let mut col = values;
            center(&mut col);
            let mean = col.iter().sum::<f64>() / col.len() as f64;
            prop_assert!(mean.abs() < 1e-9);
        }

        #[test]
        fn prop_standardize_unit_variance(
            values in proptest::collection::vec(-1e3f64..1e3, 4..64)
        ) {
            let spread = sample_variance(&values);
            prop_assume!(spread > 1e-6);
            let mut col = values;
            standardize(&mut col);
            prop_assert!((sample_variance(&col) - 1.0).abs() < 1e-6);
        }

        #[test]
        fn prop_grouping_partitions(cells in 1usize..16) {
            let subjects = cells * 4;
            for repeated in [
                RepeatedFactors::None,
                RepeatedFactors::X,
                RepeatedFactors::Z,
                RepeatedFactors::Both,
            ] {
                let plan = GroupingPlan::new(subjects, repeated);
                prop_assert_eq!(plan.subject_of.len(), subjects);
                // Every subject id is in range and every subject appears
                let mut seen = vec![0usize; plan.n_subjects];
                for &s in &plan.subject_of {
                    prop_assert!(s < plan.n_subjects);
                    seen[s] += 1;
                }
                prop_assert!(seen.iter().all(|&count| count > 0));
            }
        }
    }
}
