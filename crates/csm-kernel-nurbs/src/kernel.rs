//! In-process host kernel backed by [`BSplineCurve`] and [`BSplineSurface`].

use csm_kernel_geom::{GeometryError, GeometryKernel, Result};
use csm_kernel_math::Point3;

use crate::{BSplineCurve, BSplineSurface};

/// Handle accounting for a kernel context.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KernelStats {
    /// Geometry objects successfully built.
    pub created: usize,
    /// Geometry objects handed back through `destroy_*`.
    pub destroyed: usize,
}

impl KernelStats {
    /// Objects built but not yet destroyed.
    pub fn live(&self) -> usize {
        self.created.saturating_sub(self.destroyed)
    }
}

/// Geometry kernel context that builds non-rational B-splines in process.
///
/// Handles are plain values; the context only counts them so callers can
/// check that every intermediate object was released.
#[derive(Debug, Default)]
pub struct NativeKernel {
    stats: KernelStats,
}

impl NativeKernel {
    /// Create an empty kernel context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current handle accounting.
    pub fn stats(&self) -> KernelStats {
        self.stats
    }
}

/// Control point count implied by a knot vector of the given degree.
fn count_from_knots(knots: &[f64], degree: usize) -> Result<usize> {
    if degree == 0 {
        return Err(GeometryError::UnsupportedDegree(degree));
    }
    match knots.len().checked_sub(degree + 1) {
        Some(n) if n > degree => Ok(n),
        _ => Err(GeometryError::KnotCount {
            expected: 2 * (degree + 1),
            found: knots.len(),
        }),
    }
}

impl GeometryKernel for NativeKernel {
    type Curve = BSplineCurve;
    type Surface = BSplineSurface;

    fn make_curve(
        &mut self,
        degree: usize,
        knots: &[f64],
        control_points: &[Point3],
    ) -> Result<BSplineCurve> {
        let curve = BSplineCurve::new(control_points.to_vec(), knots.to_vec(), degree)?;
        self.stats.created += 1;
        Ok(curve)
    }

    fn make_surface(
        &mut self,
        degree: usize,
        knots_u: &[f64],
        knots_v: &[f64],
        control_points: &[Point3],
    ) -> Result<BSplineSurface> {
        let n_u = count_from_knots(knots_u, degree)?;
        let n_v = count_from_knots(knots_v, degree)?;
        let surface = BSplineSurface::new(
            control_points.to_vec(),
            n_u,
            n_v,
            knots_u.to_vec(),
            knots_v.to_vec(),
            degree,
            degree,
        )?;
        self.stats.created += 1;
        Ok(surface)
    }

    fn destroy_curve(&mut self, curve: BSplineCurve) {
        self.stats.destroyed += 1;
        drop(curve);
    }

    fn destroy_surface(&mut self, surface: BSplineSurface) {
        self.stats.destroyed += 1;
        drop(surface);
    }
}
