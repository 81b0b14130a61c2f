#![warn(missing_docs)]

//! Parametric curve and surface abstractions for the CSM freeform kernel.
//!
//! Provides the trait-based interface every geometry object exposes
//! (position plus first and second derivatives), and [`GeometryKernel`],
//! the host-kernel boundary the spline fitters talk to: create a B-spline
//! from degree/knots/control points, evaluate it, destroy it.

pub mod error;

pub use error::{GeometryError, Result};

use csm_kernel_math::{Dir3, Point2, Point3, Tolerance, Vec3};

// =============================================================================
// Evaluation records
// =============================================================================

/// Position and derivatives of a curve at one parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDerivatives {
    /// Point on the curve.
    pub point: Point3,
    /// First derivative `dC/dt`.
    pub d1: Vec3,
    /// Second derivative `d²C/dt²`.
    pub d2: Vec3,
}

/// Position and partial derivatives of a surface at one `(u, v)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDerivatives {
    /// Point on the surface.
    pub point: Point3,
    /// `∂S/∂u`.
    pub du: Vec3,
    /// `∂S/∂v`.
    pub dv: Vec3,
    /// `∂²S/∂u²`.
    pub duu: Vec3,
    /// `∂²S/∂u∂v` (the twist term).
    pub duv: Vec3,
    /// `∂²S/∂v²`.
    pub dvv: Vec3,
}

// =============================================================================
// Surface and curve traits
// =============================================================================

/// A parametric surface in 3D space.
pub trait Surface: Send + Sync + std::fmt::Debug {
    /// Evaluate the surface at parameter `(u, v)` to get a 3D point.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Position plus first and second partial derivatives at `(u, v)`.
    fn derivatives(&self, uv: Point2) -> SurfaceDerivatives;

    /// Parameter domain as `((u_min, u_max), (v_min, v_max))`.
    fn domain(&self) -> ((f64, f64), (f64, f64));

    /// Surface normal at `(u, v)`, `S_u × S_v` normalized.
    ///
    /// Degenerate points (parallel or vanishing partials) report +Z.
    fn normal(&self, uv: Point2) -> Dir3 {
        let d = self.derivatives(uv);
        let n = d.du.cross(&d.dv);
        if n.norm() < 1e-15 {
            Dir3::new_normalize(Vec3::z())
        } else {
            Dir3::new_normalize(n)
        }
    }
}

/// A parametric curve in 3D space.
pub trait Curve3d: Send + Sync + std::fmt::Debug {
    /// Evaluate the curve at parameter `t` to get a 3D point.
    fn evaluate(&self, t: f64) -> Point3;

    /// Position plus first and second derivatives at `t`.
    fn derivatives(&self, t: f64) -> CurveDerivatives;

    /// Parameter domain `(t_min, t_max)`.
    fn domain(&self) -> (f64, f64);
}

// =============================================================================
// Host kernel interface
// =============================================================================

/// The host geometry kernel as seen by the spline fitters.
///
/// Geometry objects are immutable once built: a caller that wants different
/// control points builds a new object and hands the old one back through
/// `destroy_*`. Every handle obtained from `make_*` must be destroyed exactly
/// once or returned to the caller.
pub trait GeometryKernel {
    /// Handle to a curve owned by the kernel.
    type Curve: Curve3d;
    /// Handle to a surface owned by the kernel.
    type Surface: Surface;

    /// Build a non-rational B-spline curve.
    fn make_curve(
        &mut self,
        degree: usize,
        knots: &[f64],
        control_points: &[Point3],
    ) -> Result<Self::Curve>;

    /// Build a non-rational tensor-product B-spline surface.
    ///
    /// `control_points` is row-major: `points[v_idx * n_u + u_idx]`, with the
    /// counts `n_u`, `n_v` implied by the knot vectors.
    fn make_surface(
        &mut self,
        degree: usize,
        knots_u: &[f64],
        knots_v: &[f64],
        control_points: &[Point3],
    ) -> Result<Self::Surface>;

    /// Evaluate a curve and its derivatives at `t`.
    fn evaluate_curve(&self, curve: &Self::Curve, t: f64) -> Result<CurveDerivatives> {
        let (min, max) = curve.domain();
        if !t.is_finite() || !Tolerance::DEFAULT.in_domain(t, min, max) {
            return Err(GeometryError::ParameterOutOfRange { t, min, max });
        }
        Ok(curve.derivatives(t.clamp(min, max)))
    }

    /// Evaluate a surface and its partial derivatives at `(u, v)`.
    fn evaluate_surface(&self, surface: &Self::Surface, uv: Point2) -> Result<SurfaceDerivatives> {
        let ((u_min, u_max), (v_min, v_max)) = surface.domain();
        let tol = Tolerance::DEFAULT;
        if !uv.x.is_finite() || !tol.in_domain(uv.x, u_min, u_max) {
            return Err(GeometryError::ParameterOutOfRange {
                t: uv.x,
                min: u_min,
                max: u_max,
            });
        }
        if !uv.y.is_finite() || !tol.in_domain(uv.y, v_min, v_max) {
            return Err(GeometryError::ParameterOutOfRange {
                t: uv.y,
                min: v_min,
                max: v_max,
            });
        }
        let uv = Point2::new(uv.x.clamp(u_min, u_max), uv.y.clamp(v_min, v_max));
        Ok(surface.derivatives(uv))
    }

    /// Release a curve handle.
    fn destroy_curve(&mut self, curve: Self::Curve) {
        drop(curve);
    }

    /// Release a surface handle.
    fn destroy_surface(&mut self, surface: Self::Surface) {
        drop(surface);
    }
}
