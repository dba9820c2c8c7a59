//! Power simulation engine.
//!
//! Drives the nested Monte-Carlo loop: outer runs estimate the variability
//! of the power estimate, inner experiments estimate power itself. All
//! structural decisions (regressor source, residual covariance, fitting
//! strategy) are resolved once at construction into a [`SimulationPlan`];
//! the loop body only draws, fits, and counts.

pub mod rng;

use nalgebra::Cholesky;
use rayon::prelude::*;

use crate::config::{DesignMode, PowerConfig, TestingMode};
use crate::design::{
    add_measurement_noise, correlation_matrix, interaction, GroupingPlan, NoiseModel,
    RegressorSource, SimulatedDataset,
};
use crate::error::{PowerError, PowerResult};
use crate::fit::{FitStrategy, TermTests};
use crate::power::{PowerMatrix, PowerRow};
use rng::PowerRng;

/// Everything the inner loop needs, precomputed from the configuration.
#[derive(Debug, Clone)]
struct SimulationPlan {
    /// Where predictor columns come from.
    source: RegressorSource,
    /// Residual noise model (iid or structured covariance).
    noise: NoiseModel,
    /// Which model gets fitted and how significance is assessed.
    strategy: FitStrategy,
}

impl SimulationPlan {
    fn from_config(config: &PowerConfig) -> PowerResult<Self> {
        let n = config.subjects;

        let ols_strategy = match config.testing {
            TestingMode::Simultaneous => FitStrategy::OlsSimultaneous,
            TestingMode::Sequential => FitStrategy::OlsSequential,
        };

        match &config.design {
            DesignMode::Experimental {
                repeated,
                within_correlation,
            } => {
                let source = RegressorSource::Factorial { cell_size: n / 4 };
                let grouping = GroupingPlan::new(n, *repeated);

                let noise = if *within_correlation > 0.0 && grouping.has_repeats() {
                    let c = correlation_matrix(&grouping, *within_correlation);
                    let chol = Cholesky::new(c).ok_or_else(|| {
                        PowerError::config(
                            "within-subject correlation matrix is not positive definite",
                        )
                    })?;
                    NoiseModel::Structured {
                        sd: config.noise_sd,
                        chol: chol.l(),
                    }
                } else {
                    NoiseModel::Iid {
                        sd: config.noise_sd,
                        n,
                    }
                };

                let strategy = if grouping.has_repeats() {
                    FitStrategy::RandomIntercept { grouping }
                } else {
                    ols_strategy
                };

                Ok(Self {
                    source,
                    noise,
                    strategy,
                })
            }
            DesignMode::Field {
                var_x,
                var_z,
                cov_xz,
                raw,
            } => {
                let source = if let Some(raw) = raw {
                    RegressorSource::Raw {
                        x: raw.x.clone(),
                        z: raw.z.clone(),
                    }
                } else {
                    // 2x2 Cholesky of the regressor covariance; validation
                    // already rejected the singular case.
                    let l11 = var_x.sqrt();
                    let l21 = cov_xz / l11;
                    let l22 = (var_z - l21 * l21).sqrt();
                    RegressorSource::Bivariate {
                        n,
                        chol: [l11, l21, l22],
                    }
                };

                Ok(Self {
                    source,
                    noise: NoiseModel::Iid {
                        sd: config.noise_sd,
                        n,
                    },
                    strategy: ols_strategy,
                })
            }
        }
    }
}

/// Monte-Carlo power simulation engine.
///
/// Owns its random generator; a given seed reproduces the full power
/// matrix bit for bit.
#[derive(Debug)]
pub struct PowerEngine {
    config: PowerConfig,
    plan: SimulationPlan,
    rng: PowerRng,
}

impl PowerEngine {
    /// Validate the configuration and precompute the simulation plan.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for any violated precondition
    /// (invalid subject count, singular covariance, degenerate raw
    /// columns). Nothing is simulated until construction succeeds.
    pub fn new(config: PowerConfig) -> PowerResult<Self> {
        config.validate_all()?;
        let plan = SimulationPlan::from_config(&config)?;
        let rng = PowerRng::new(config.reproducibility.seed);
        Ok(Self { config, plan, rng })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    /// Mutable access to the engine's RNG.
    pub fn rng_mut(&mut self) -> &mut PowerRng {
        &mut self.rng
    }

    /// Run the full power study on the current thread.
    ///
    /// # Errors
    ///
    /// Returns fitting errors surfaced by the model-fitting layer and
    /// non-finite guards on p-values.
    pub fn run(&mut self) -> PowerResult<PowerMatrix> {
        let mut rows = Vec::with_capacity(self.config.simulations);
        for _ in 0..self.config.simulations {
            rows.push(simulate_run(&self.plan, &self.config, &mut self.rng)?);
        }
        Ok(PowerMatrix::new(rows))
    }

    /// Run the power study with outer runs distributed over worker threads.
    ///
    /// Each outer run consumes its own partitioned RNG stream, so the
    /// result is identical regardless of thread count and across repeated
    /// invocations from a fresh engine with the same seed.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::run`]; the first error aborts.
    pub fn run_parallel(&mut self) -> PowerResult<PowerMatrix> {
        let streams = self.rng.partition(self.config.simulations);
        let plan = &self.plan;
        let config = &self.config;

        let rows = streams
            .into_par_iter()
            .map(|mut stream| simulate_run(plan, config, &mut stream))
            .collect::<PowerResult<Vec<_>>>()?;

        Ok(PowerMatrix::new(rows))
    }
}

/// One outer simulation run: detection frequencies over the inner loop.
fn simulate_run(
    plan: &SimulationPlan,
    config: &PowerConfig,
    rng: &mut PowerRng,
) -> PowerResult<PowerRow> {
    let mut hits = [0usize; 3];

    for _ in 0..config.experiments {
        let tests = simulate_experiment(plan, config, rng)?;
        if !tests.is_finite() {
            return Err(PowerError::non_finite("fitted p-values"));
        }
        for (count, p) in hits.iter_mut().zip(tests.as_array()) {
            if p < config.alpha {
                *count += 1;
            }
        }
    }

    let denom = config.experiments as f64;
    Ok(PowerRow {
        x: hits[0] as f64 / denom,
        z: hits[1] as f64 / denom,
        xz: hits[2] as f64 / denom,
    })
}

/// One inner experiment: synthesize a dataset and fit it.
fn simulate_experiment(
    plan: &SimulationPlan,
    config: &PowerConfig,
    rng: &mut PowerRng,
) -> PowerResult<TermTests> {
    let (x, z) = plan.source.draw(rng);
    let xz = interaction(&x, &z);

    // The response is generated from the true regressors
    let e = plan.noise.sample(rng);
    let y: Vec<f64> = (0..x.len())
        .map(|i| {
            config.effects.x * x[i]
                + config.effects.z * z[i]
                + config.effects.xz * xz[i]
                + e[i]
        })
        .collect();

    // Errors in variables: the fitted regressors carry measurement noise
    let (x, z, xz) = if config.measurement_sd > 0.0 {
        let mut x_obs = x;
        let mut z_obs = z;
        add_measurement_noise(&mut x_obs, config.measurement_sd, rng);
        add_measurement_noise(&mut z_obs, config.measurement_sd, rng);
        let xz_obs = interaction(&x_obs, &z_obs);
        (x_obs, z_obs, xz_obs)
    } else {
        (x, z, xz)
    };

    let data = SimulatedDataset { y, x, z, xz };
    plan.strategy.fit(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DesignMode, RepeatedFactors};
    use crate::power::Term;

    fn small_config(seed: u64) -> PowerConfig {
        PowerConfig::builder()
            .seed(seed)
            .subjects(40)
            .simulations(4)
            .experiments(25)
            .effects(0.5, 0.5, 0.5)
            .noise_sd(1.0)
            .build()
    }

    #[test]
    fn test_matrix_dimensions() {
        let mut engine = PowerEngine::new(small_config(42)).unwrap();
        let matrix = engine.run().unwrap();
        assert_eq!(matrix.rows().len(), 4);
        for row in matrix.rows() {
            for v in row.as_array() {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_same_seed_reproduces() {
        let mut e1 = PowerEngine::new(small_config(42)).unwrap();
        let mut e2 = PowerEngine::new(small_config(42)).unwrap();
        let m1 = e1.run().unwrap();
        let m2 = e2.run().unwrap();
        for (a, b) in m1.rows().iter().zip(m2.rows()) {
            assert_eq!(a.as_array(), b.as_array());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut e1 = PowerEngine::new(small_config(1)).unwrap();
        let mut e2 = PowerEngine::new(small_config(2)).unwrap();
        let m1 = e1.run().unwrap();
        let m2 = e2.run().unwrap();
        let same = m1
            .rows()
            .iter()
            .zip(m2.rows())
            .all(|(a, b)| a.as_array() == b.as_array());
        assert!(!same, "independent seeds produced identical matrices");
    }

    #[test]
    fn test_parallel_reproduces() {
        let mut e1 = PowerEngine::new(small_config(42)).unwrap();
        let mut e2 = PowerEngine::new(small_config(42)).unwrap();
        let m1 = e1.run_parallel().unwrap();
        let m2 = e2.run_parallel().unwrap();
        for (a, b) in m1.rows().iter().zip(m2.rows()) {
            assert_eq!(a.as_array(), b.as_array());
        }
    }

    #[test]
    fn test_null_effects_hold_alpha_level() {
        let config = PowerConfig::builder()
            .seed(9)
            .subjects(40)
            .simulations(2)
            .experiments(400)
            .effects(0.0, 0.0, 0.0)
            .noise_sd(1.0)
            .build();
        let mut engine = PowerEngine::new(config).unwrap();
        let matrix = engine.run().unwrap();
        for term in Term::ALL {
            let p = matrix.mean(term);
            assert!(p < 0.12, "false positive rate {p} for {term} far above alpha");
        }
    }

    #[test]
    fn test_repeated_measures_uses_mixed_fit() {
        let config = PowerConfig::builder()
            .seed(5)
            .subjects(24)
            .simulations(2)
            .experiments(10)
            .effects(0.8, 0.8, 0.8)
            .noise_sd(1.0)
            .design(DesignMode::Experimental {
                repeated: RepeatedFactors::X,
                within_correlation: 0.5,
            })
            .build();
        let engine = PowerEngine::new(config).unwrap();
        assert!(matches!(
            engine.plan.strategy,
            FitStrategy::RandomIntercept { .. }
        ));
        assert!(matches!(engine.plan.noise, NoiseModel::Structured { .. }));
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let config = PowerConfig::builder()
            .seed(1)
            .subjects(42) // not a multiple of 4
            .build();
        assert!(PowerEngine::new(config).is_err());
    }
}
