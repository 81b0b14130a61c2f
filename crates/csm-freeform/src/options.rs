//! Freeform builder settings.

use csm_fit::{FitOptions, Result};
use serde::{Deserialize, Serialize};

/// Settings for [`build_freeform`](crate::build_freeform).
///
/// ```toml
/// parallel = false
///
/// [fit]
/// max_iterations = 500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeformOptions {
    /// Options shared by every curve and surface fit.
    pub fit: FitOptions,
    /// Fit brick faces and edges on the rayon thread pool.
    pub parallel: bool,
}

impl Default for FreeformOptions {
    fn default() -> Self {
        Self {
            fit: FitOptions::default(),
            parallel: true,
        }
    }
}

impl FreeformOptions {
    /// Validate options.
    pub fn validate(&self) -> Result<()> {
        self.fit.validate()
    }

    /// Parse and validate options from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: Self = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csm_fit::FitError;

    #[test]
    fn test_default_is_parallel() {
        let o = FreeformOptions::default();
        assert!(o.parallel);
        assert_eq!(o.fit, FitOptions::default());
    }

    #[test]
    fn test_from_toml() {
        let o = FreeformOptions::from_toml_str("parallel = false\n\n[fit]\nmax_iterations = 500\n")
            .unwrap();
        assert!(!o.parallel);
        assert_eq!(o.fit.max_iterations, 500);
        assert_eq!(o.fit.relaxation, csm_fit::DEFAULT_RELAXATION);
    }

    #[test]
    fn test_from_toml_validates_fit() {
        assert!(matches!(
            FreeformOptions::from_toml_str("[fit]\ntolerance = -1.0\n"),
            Err(FitError::InvalidOptions(_))
        ));
        assert!(matches!(
            FreeformOptions::from_toml_str("parallel = 3"),
            Err(FitError::Config(_))
        ));
    }
}
