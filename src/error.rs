//! Error types for poder.
//!
//! All failures are surfaced as `Result<T, PowerError>`; configuration
//! errors are raised at construction time, before any simulation work,
//! never mid-loop.

use thiserror::Error;

/// Result type alias for poder operations.
pub type PowerResult<T> = Result<T, PowerError>;

/// Unified error type for all poder operations.
///
/// # Design
///
/// Errors fall into two families:
/// 1. Configuration-precondition violations (invalid subject count,
///    singular covariance), detected before the simulation loop starts.
/// 2. Numerical fitting failures (rank-deficient design, non-converged
///    variance components), which abort the current run. No retries.
#[derive(Debug, Error)]
pub enum PowerError {
    // ===== Configuration Errors =====
    /// Invalid configuration parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== Fitting Errors =====
    /// Model fitting failure (rank-deficient design, non-convergence).
    #[error("Model fitting error: {message}")]
    Fit {
        /// Description of the fitting failure.
        message: String,
    },

    /// Numerical instability detected (NaN or Inf).
    #[error("Non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location where the non-finite value was detected.
        location: String,
    },

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PowerError {
    /// Create a configuration error from any displayable message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a fitting error from any displayable message.
    pub fn fit(message: impl Into<String>) -> Self {
        Self::Fit {
            message: message.into(),
        }
    }

    /// Create a non-finite value error at the given location.
    pub fn non_finite(location: impl Into<String>) -> Self {
        Self::NonFiniteValue {
            location: location.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = PowerError::config("subjects must be a multiple of 4");
        assert!(err.to_string().contains("multiple of 4"));
    }

    #[test]
    fn test_fit_error_display() {
        let err = PowerError::fit("design matrix is rank deficient");
        assert!(err.to_string().contains("rank deficient"));
    }

    #[test]
    fn test_non_finite_error_display() {
        let err = PowerError::non_finite("p-value for interaction term");
        assert!(err.to_string().contains("interaction"));
    }
}
