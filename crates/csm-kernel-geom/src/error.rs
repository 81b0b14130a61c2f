//! Error types for the host geometry kernel.

use thiserror::Error;

/// Errors raised when the kernel rejects a construction or evaluation call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Degree must be at least 1.
    #[error("unsupported degree {0}")]
    UnsupportedDegree(usize),

    /// Knot vector length doesn't match `control points + degree + 1`.
    #[error("knot vector has {found} entries, expected {expected}")]
    KnotCount {
        /// Required number of knots.
        expected: usize,
        /// Number of knots supplied.
        found: usize,
    },

    /// Knot vector is not non-decreasing.
    #[error("knot vector decreases at index {index}")]
    DecreasingKnots {
        /// Index of the first knot smaller than its predecessor.
        index: usize,
    },

    /// The parameter domain has zero length.
    #[error("empty parameter domain [{min}, {max}]")]
    EmptyDomain {
        /// Lower bound of the domain.
        min: f64,
        /// Upper bound of the domain.
        max: f64,
    },

    /// Control point count doesn't match the knot vectors.
    #[error("got {found} control points, expected {expected}")]
    ControlPointCount {
        /// Required number of control points.
        expected: usize,
        /// Number of control points supplied.
        found: usize,
    },

    /// A knot or control point coordinate is NaN or infinite.
    #[error("non-finite {what} at index {index}")]
    NonFinite {
        /// Which input held the bad value ("knot" or "control point").
        what: &'static str,
        /// Index of the offending entry.
        index: usize,
    },

    /// Evaluation parameter lies outside the geometry's domain.
    #[error("parameter {t} outside domain [{min}, {max}]")]
    ParameterOutOfRange {
        /// Requested parameter.
        t: f64,
        /// Lower bound of the domain.
        min: f64,
        /// Upper bound of the domain.
        max: f64,
    },

    /// Kernel-specific failure.
    #[error("kernel error: {0}")]
    Kernel(String),
}

/// Result type for geometry kernel operations.
pub type Result<T> = std::result::Result<T, GeometryError>;
