#![warn(missing_docs)]

//! Cubic B-spline interpolation by fixed-point relaxation.
//!
//! [`fit_curve`] builds a cubic B-spline curve through an ordered list of
//! points; [`fit_surface`] builds a bicubic B-spline surface through a
//! rectangular [`PointGrid`]. Both work against any [`GeometryKernel`]:
//! each iteration evaluates the current geometry, nudges the control points
//! toward the data, then asks the kernel for a fresh object. The fitted
//! geometry is handed back together with a [`FitStatus`] saying whether the
//! tolerance was reached.
//!
//! End conditions are the chord slopes of the data (and for surfaces the
//! twist at the four corners is driven to zero). Slope and twist updates are
//! damped by [`FitOptions::relaxation`]; point updates take the full step.
//!
//! [`GeometryKernel`]: csm_kernel_geom::GeometryKernel

mod axis;
pub mod curve;
pub mod error;
pub mod grid;
pub mod options;
pub mod surface;

use serde::Serialize;

pub use curve::fit_curve;
pub use error::{FitError, Result};
pub use grid::PointGrid;
pub use options::{FitOptions, DEFAULT_MAX_ITERATIONS, DEFAULT_RELAXATION, DEFAULT_TOLERANCE};
pub use surface::{fit_surface, RowRule};

/// Degree of every fitted curve and surface (in both directions).
pub const DEGREE: usize = 3;

/// Outcome of a relaxation loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FitStatus {
    /// Residual dropped below tolerance before the iteration cap.
    pub converged: bool,
    /// Iterations performed, including the converging one.
    pub iterations: usize,
    /// Largest per-coordinate residual of the last evaluated geometry.
    ///
    /// On convergence that is the returned geometry. Otherwise the returned
    /// geometry was rebuilt after this residual was measured, so its own
    /// error is usually smaller but has not been evaluated.
    pub max_residual: f64,
}

/// Fitted geometry plus the status of the loop that produced it.
///
/// `geometry` is a live kernel handle; the caller owns it and must hand it
/// back to the kernel when done.
#[derive(Debug)]
pub struct Fit<G> {
    /// The fitted curve or surface.
    pub geometry: G,
    /// How the loop ended.
    pub status: FitStatus,
}

impl<G> Fit<G> {
    /// Whether the loop converged.
    pub fn converged(&self) -> bool {
        self.status.converged
    }
}

/// Log the end of a fitting loop.
fn report(what: &str, status: &FitStatus, options: &FitOptions) {
    if status.converged {
        log::debug!(
            "{} fit converged after {} iterations (residual {:.3e})",
            what,
            status.iterations,
            status.max_residual
        );
    } else {
        log::warn!(
            "{} fit did not converge in {} iterations (residual {:.3e} > {:.3e})",
            what,
            status.iterations,
            status.max_residual,
            options.tolerance
        );
    }
}
