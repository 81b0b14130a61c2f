//! Error types for the spline fitters.

use csm_kernel_geom::GeometryError;
use thiserror::Error;

/// Errors that can occur while fitting.
///
/// Running out of iterations is not an error; see
/// [`FitStatus::converged`](crate::FitStatus::converged).
#[derive(Error, Debug)]
pub enum FitError {
    /// Point grid is too small or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Relaxation, tolerance or iteration budget out of range.
    #[error("invalid fit options: {0}")]
    InvalidOptions(String),

    /// The geometry kernel rejected a construction or evaluation.
    #[error("geometry kernel error: {0}")]
    Geometry(#[from] GeometryError),

    /// Options could not be parsed.
    #[error("failed to parse fit options: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for fitting operations.
pub type Result<T> = std::result::Result<T, FitError>;
