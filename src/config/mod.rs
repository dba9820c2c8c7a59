//! Configuration system with YAML schema and validation.
//!
//! Every option of a power study is an explicit, named field; there is no
//! implicit null-defaulting. Constraints are checked once, at
//! construction, so a bad configuration is rejected before any simulation
//! work begins rather than discovered mid-loop.

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::{PowerError, PowerResult};

/// Top-level power study configuration.
///
/// Loaded from YAML files with full schema validation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PowerConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Study metadata.
    #[validate(nested)]
    #[serde(default)]
    pub study: StudyMeta,

    /// Number of outer simulation runs (rows of the power matrix).
    #[serde(default = "default_simulations")]
    pub simulations: usize,

    /// Number of inner experiments per simulation run.
    #[serde(default = "default_experiments")]
    pub experiments: usize,

    /// Subjects per experiment.
    pub subjects: usize,

    /// True effect sizes for the three model terms.
    #[serde(default)]
    pub effects: Effects,

    /// Residual noise standard deviation.
    #[serde(default = "default_noise_sd")]
    pub noise_sd: f64,

    /// Regressor measurement-noise standard deviation (0 disables).
    #[serde(default)]
    pub measurement_sd: f64,

    /// Significance threshold.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Significance testing convention.
    #[serde(default)]
    pub testing: TestingMode,

    /// Regressor generation mode.
    #[serde(default)]
    pub design: DesignMode,

    /// Reproducibility settings.
    #[validate(nested)]
    #[serde(default)]
    pub reproducibility: ReproducibilityConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

const fn default_simulations() -> usize {
    20
}

const fn default_experiments() -> usize {
    100
}

const fn default_noise_sd() -> f64 {
    1.0
}

const fn default_alpha() -> f64 {
    0.05
}

const fn default_unit_variance() -> f64 {
    1.0
}

impl PowerConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> PowerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> PowerResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;

        // Schema-level constraints
        config.validate()?;

        // Semantic constraints beyond the schema
        config.validate_semantic()?;

        Ok(config)
    }

    /// Create a builder for programmatic construction.
    #[must_use]
    pub fn builder() -> PowerConfigBuilder {
        PowerConfigBuilder::default()
    }

    /// Run both schema-level and semantic validation.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate_all(&self) -> PowerResult<()> {
        self.validate()?;
        self.validate_semantic()
    }

    /// Validate semantic constraints beyond the schema.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the violated precondition.
    pub fn validate_semantic(&self) -> PowerResult<()> {
        if self.simulations == 0 {
            return Err(PowerError::config("simulations must be at least 1"));
        }
        if self.experiments == 0 {
            return Err(PowerError::config("experiments must be at least 1"));
        }
        if self.subjects < 8 {
            return Err(PowerError::config(format!(
                "need at least 8 subjects to fit 4 coefficients, got {}",
                self.subjects
            )));
        }
        if !self.noise_sd.is_finite() || self.noise_sd <= 0.0 {
            return Err(PowerError::config("noise_sd must be positive and finite"));
        }
        if !self.measurement_sd.is_finite() || self.measurement_sd < 0.0 {
            return Err(PowerError::config(
                "measurement_sd must be non-negative and finite",
            ));
        }
        if !(0.0..1.0).contains(&self.alpha) || self.alpha <= 0.0 {
            return Err(PowerError::config("alpha must lie in (0, 1)"));
        }
        for (name, value) in [
            ("x", self.effects.x),
            ("z", self.effects.z),
            ("xz", self.effects.xz),
        ] {
            if !value.is_finite() {
                return Err(PowerError::config(format!(
                    "effect size for {name} must be finite"
                )));
            }
        }

        match &self.design {
            DesignMode::Experimental {
                repeated,
                within_correlation,
            } => {
                // Subjects are partitioned into 4 cells
                if self.subjects % 4 != 0 {
                    return Err(PowerError::config(format!(
                        "experimental designs need subjects divisible by 4, got {}",
                        self.subjects
                    )));
                }
                if !(0.0..1.0).contains(within_correlation) {
                    return Err(PowerError::config(
                        "within_correlation must lie in [0, 1)",
                    ));
                }
                if *within_correlation > 0.0 && *repeated == RepeatedFactors::None {
                    return Err(PowerError::config(
                        "within_correlation requires a repeated factor",
                    ));
                }
            }
            DesignMode::Field {
                var_x,
                var_z,
                cov_xz,
                raw,
            } => {
                if let Some(raw) = raw {
                    raw.validate_against(self.subjects)?;
                } else {
                    if !var_x.is_finite() || *var_x <= 0.0 {
                        return Err(PowerError::config("var_x must be positive and finite"));
                    }
                    if !var_z.is_finite() || *var_z <= 0.0 {
                        return Err(PowerError::config("var_z must be positive and finite"));
                    }
                    if !cov_xz.is_finite() || cov_xz * cov_xz >= var_x * var_z {
                        return Err(PowerError::config(
                            "cov_xz^2 must be below var_x * var_z (singular covariance)",
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            study: StudyMeta::default(),
            simulations: default_simulations(),
            experiments: default_experiments(),
            subjects: 40,
            effects: Effects::default(),
            noise_sd: default_noise_sd(),
            measurement_sd: 0.0,
            alpha: default_alpha(),
            testing: TestingMode::default(),
            design: DesignMode::default(),
            reproducibility: ReproducibilityConfig::default(),
        }
    }
}

/// Study metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StudyMeta {
    /// Study name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

/// True effect sizes for the three model terms.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Effects {
    /// Main effect of X.
    #[serde(default)]
    pub x: f64,
    /// Main effect of Z.
    #[serde(default)]
    pub z: f64,
    /// XZ interaction.
    #[serde(default)]
    pub xz: f64,
}

/// Which factors vary within subjects in a repeated-measures design.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatedFactors {
    /// Fully between-subjects.
    #[default]
    None,
    /// X varies within subjects.
    X,
    /// Z varies within subjects.
    Z,
    /// Both factors vary within subjects.
    Both,
}

/// Significance testing convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestingMode {
    /// Each term tested controlling for the other two (marginal t).
    #[default]
    Simultaneous,
    /// Terms tested in order X, Z, XZ (type-I sequential F).
    Sequential,
}

/// Caller-supplied raw regressor columns for field studies.
///
/// Bypasses random generation; the columns are centered before use but
/// never rescaled, since their scale may be meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRegressors {
    /// Raw first predictor.
    pub x: Vec<f64>,
    /// Raw second predictor.
    pub z: Vec<f64>,
}

impl RawRegressors {
    fn validate_against(&self, subjects: usize) -> PowerResult<()> {
        if self.x.len() != subjects || self.z.len() != subjects {
            return Err(PowerError::config(format!(
                "raw regressors must have one value per subject ({}), got {} and {}",
                subjects,
                self.x.len(),
                self.z.len()
            )));
        }
        for (name, col) in [("x", &self.x), ("z", &self.z)] {
            if col.iter().any(|v| !v.is_finite()) {
                return Err(PowerError::config(format!(
                    "raw regressor {name} contains non-finite values"
                )));
            }
            if crate::design::sample_variance(col) <= 0.0 {
                return Err(PowerError::config(format!(
                    "raw regressor {name} is degenerate (zero variance)"
                )));
            }
        }
        Ok(())
    }
}

/// Regressor generation mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DesignMode {
    /// Discrete 2x2 factorial with researcher-controlled levels.
    Experimental {
        /// Which factors vary within subjects.
        #[serde(default)]
        repeated: RepeatedFactors,
        /// Within-subject residual correlation (`scor`), in [0, 1).
        #[serde(default)]
        within_correlation: f64,
    },
    /// Observational design with continuous bivariate-normal predictors.
    Field {
        /// Variance of X draws.
        #[serde(default = "default_unit_variance")]
        var_x: f64,
        /// Variance of Z draws.
        #[serde(default = "default_unit_variance")]
        var_z: f64,
        /// Covariance between X and Z draws.
        #[serde(default)]
        cov_xz: f64,
        /// Optional raw columns bypassing generation.
        #[serde(default)]
        raw: Option<RawRegressors>,
    },
}

impl Default for DesignMode {
    fn default() -> Self {
        Self::Experimental {
            repeated: RepeatedFactors::None,
            within_correlation: 0.0,
        }
    }
}

/// Reproducibility settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReproducibilityConfig {
    /// Master seed for all RNG.
    pub seed: u64,
}

impl Default for ReproducibilityConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct PowerConfigBuilder {
    seed: Option<u64>,
    simulations: Option<usize>,
    experiments: Option<usize>,
    subjects: Option<usize>,
    effects: Option<Effects>,
    noise_sd: Option<f64>,
    measurement_sd: Option<f64>,
    alpha: Option<f64>,
    testing: Option<TestingMode>,
    design: Option<DesignMode>,
}

impl PowerConfigBuilder {
    /// Set the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of outer simulation runs.
    #[must_use]
    pub const fn simulations(mut self, simulations: usize) -> Self {
        self.simulations = Some(simulations);
        self
    }

    /// Set the number of inner experiments per run.
    #[must_use]
    pub const fn experiments(mut self, experiments: usize) -> Self {
        self.experiments = Some(experiments);
        self
    }

    /// Set the number of subjects per experiment.
    #[must_use]
    pub const fn subjects(mut self, subjects: usize) -> Self {
        self.subjects = Some(subjects);
        self
    }

    /// Set the three true effect sizes.
    #[must_use]
    pub const fn effects(mut self, x: f64, z: f64, xz: f64) -> Self {
        self.effects = Some(Effects { x, z, xz });
        self
    }

    /// Set the residual noise standard deviation.
    #[must_use]
    pub const fn noise_sd(mut self, noise_sd: f64) -> Self {
        self.noise_sd = Some(noise_sd);
        self
    }

    /// Set the regressor measurement-noise standard deviation.
    #[must_use]
    pub const fn measurement_sd(mut self, measurement_sd: f64) -> Self {
        self.measurement_sd = Some(measurement_sd);
        self
    }

    /// Set the significance threshold.
    #[must_use]
    pub const fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Set the significance testing convention.
    #[must_use]
    pub const fn testing(mut self, testing: TestingMode) -> Self {
        self.testing = Some(testing);
        self
    }

    /// Set the regressor generation mode.
    #[must_use]
    pub fn design(mut self, design: DesignMode) -> Self {
        self.design = Some(design);
        self
    }

    /// Build the configuration.
    ///
    /// Constraints are checked when the configuration reaches
    /// [`crate::engine::PowerEngine::new`].
    #[must_use]
    pub fn build(self) -> PowerConfig {
        let mut config = PowerConfig::default();

        if let Some(seed) = self.seed {
            config.reproducibility.seed = seed;
        }
        if let Some(simulations) = self.simulations {
            config.simulations = simulations;
        }
        if let Some(experiments) = self.experiments {
            config.experiments = experiments;
        }
        if let Some(subjects) = self.subjects {
            config.subjects = subjects;
        }
        if let Some(effects) = self.effects {
            config.effects = effects;
        }
        if let Some(noise_sd) = self.noise_sd {
            config.noise_sd = noise_sd;
        }
        if let Some(measurement_sd) = self.measurement_sd {
            config.measurement_sd = measurement_sd;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(testing) = self.testing {
            config.testing = testing;
        }
        if let Some(design) = self.design {
            config.design = design;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r"
subjects: 40
effects: { x: 1.0, z: 1.0, xz: 1.0 }
noise_sd: 15.0
";

    #[test]
    fn test_minimal_yaml_defaults() {
        let config = PowerConfig::from_yaml(MINIMAL_YAML).unwrap();
        assert_eq!(config.simulations, 20);
        assert_eq!(config.experiments, 100);
        assert_eq!(config.subjects, 40);
        assert!((config.alpha - 0.05).abs() < 1e-12);
        assert_eq!(config.testing, TestingMode::Simultaneous);
        assert_eq!(config.measurement_sd, 0.0);
        assert_eq!(config.reproducibility.seed, 42);
        assert!(matches!(
            config.design,
            DesignMode::Experimental {
                repeated: RepeatedFactors::None,
                ..
            }
        ));
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r"
study:
  name: field power study
  description: correlated regressors
simulations: 10
experiments: 500
subjects: 100
effects: { x: 0.5, z: 0.5, xz: 0.5 }
noise_sd: 2.0
measurement_sd: 0.5
alpha: 0.01
testing: sequential
design:
  mode: field
  var_x: 1.0
  var_z: 1.0
  cov_xz: 0.6
reproducibility:
  seed: 1234
";
        let config = PowerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.testing, TestingMode::Sequential);
        assert_eq!(config.reproducibility.seed, 1234);
        match config.design {
            DesignMode::Field { cov_xz, .. } => assert!((cov_xz - 0.6).abs() < 1e-12),
            DesignMode::Experimental { .. } => panic!("expected field design"),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = format!("{MINIMAL_YAML}\nbogus_field: 3\n");
        assert!(PowerConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_subjects_not_multiple_of_4_rejected() {
        let yaml = r"
subjects: 42
noise_sd: 1.0
";
        let err = PowerConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("divisible by 4"));
    }

    #[test]
    fn test_singular_covariance_rejected() {
        let yaml = r"
subjects: 40
noise_sd: 1.0
design:
  mode: field
  var_x: 1.0
  var_z: 1.0
  cov_xz: 1.0
";
        let err = PowerConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn test_correlation_without_repeats_rejected() {
        let yaml = r"
subjects: 40
noise_sd: 1.0
design:
  mode: experimental
  within_correlation: 0.5
";
        let err = PowerConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("repeated factor"));
    }

    #[test]
    fn test_degenerate_raw_regressors_rejected() {
        let raw_x: Vec<String> = (0..8).map(|_| "1.0".to_string()).collect();
        let raw_z: Vec<String> = (0..8).map(|i| format!("{i}.0")).collect();
        let yaml = format!(
            r"
subjects: 8
noise_sd: 1.0
design:
  mode: field
  raw:
    x: [{}]
    z: [{}]
",
            raw_x.join(", "),
            raw_z.join(", ")
        );
        let err = PowerConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn test_raw_length_mismatch_rejected() {
        let yaml = r"
subjects: 8
noise_sd: 1.0
design:
  mode: field
  raw:
    x: [1.0, 2.0, 3.0]
    z: [1.0, 2.0, 3.0]
";
        let err = PowerConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("one value per subject"));
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let yaml = r"
subjects: 40
noise_sd: 1.0
alpha: 1.5
";
        assert!(PowerConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_builder_round_trip() {
        let config = PowerConfig::builder()
            .seed(7)
            .subjects(16)
            .simulations(3)
            .experiments(10)
            .effects(1.0, 0.5, 0.25)
            .noise_sd(2.0)
            .alpha(0.01)
            .testing(TestingMode::Sequential)
            .build();

        assert_eq!(config.reproducibility.seed, 7);
        assert_eq!(config.subjects, 16);
        assert!((config.effects.xz - 0.25).abs() < 1e-12);
        assert!(config.validate_semantic().is_ok());
    }
}
