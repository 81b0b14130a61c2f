//! Tunable constants of the relaxation scheme.

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Damping applied to slope and twist control point updates.
pub const DEFAULT_RELAXATION: f64 = 0.10;

/// Max-norm residual below which a fit counts as converged.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Iteration budget per fit.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Fitting parameters.
///
/// Missing keys take their defaults when deserialized:
///
/// ```toml
/// relaxation = 0.10
/// tolerance = 1e-7
/// max_iterations = 1000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Relaxation factor for end-slope and corner-twist updates, in `(0, 1]`.
    pub relaxation: f64,
    /// Convergence tolerance on the per-coordinate residual.
    pub tolerance: f64,
    /// Maximum number of evaluate/adjust iterations.
    pub max_iterations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            relaxation: DEFAULT_RELAXATION,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl FitOptions {
    /// Validate options.
    pub fn validate(&self) -> Result<()> {
        if !self.relaxation.is_finite() || self.relaxation <= 0.0 || self.relaxation > 1.0 {
            return Err(FitError::InvalidOptions(format!(
                "relaxation must be in (0, 1], got {}",
                self.relaxation
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(FitError::InvalidOptions(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(FitError::InvalidOptions(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate options from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: Self = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }
}
