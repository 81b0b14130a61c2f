#![warn(missing_docs)]

//! Math types for the CSM freeform kernel.
//!
//! Thin wrappers around nalgebra providing the point, vector and tolerance
//! types shared by the geometry kernel and the spline fitters.

use nalgebra::{Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// Weighted sum of points, `Σ wᵢ·pᵢ`.
///
/// The weights are not required to sum to one; callers building affine
/// blends are responsible for that.
pub fn weighted_sum<'a, I>(terms: I) -> Point3
where
    I: IntoIterator<Item = (f64, &'a Point3)>,
{
    let coords = terms
        .into_iter()
        .fold(Vec3::zeros(), |acc, (w, p)| acc + p.coords * w);
    Point3::from(coords)
}

/// Largest absolute component of a vector (the max-norm).
pub fn max_abs_component(v: &Vec3) -> f64 {
    v.amax()
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in model units.
    pub linear: f64,
    /// Slack allowed when checking a parameter against its domain.
    pub parametric: f64,
}

impl Tolerance {
    /// Default tolerances (1e-6 linear, 1e-10 parametric).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        parametric: 1e-10,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if `t` lies in `[lo, hi]`, allowing parametric slack scaled by
    /// the interval length.
    pub fn in_domain(&self, t: f64, lo: f64, hi: f64) -> bool {
        let slack = self.parametric * (hi - lo).abs().max(1.0);
        t >= lo - slack && t <= hi + slack
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weighted_sum_blend() {
        let a = Point3::new(0.0, 0.0, 4.0);
        let b = Point3::new(4.0, 8.0, 0.0);
        let p = weighted_sum([(0.75, &a), (0.25, &b)]);
        assert_relative_eq!(p, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-15);
    }

    #[test]
    fn test_weighted_sum_empty() {
        let p = weighted_sum(std::iter::empty());
        assert_eq!(p, Point3::origin());
    }

    #[test]
    fn test_max_abs_component() {
        assert_eq!(max_abs_component(&Vec3::new(0.5, -3.0, 2.0)), 3.0);
        assert_eq!(max_abs_component(&Vec3::zeros()), 0.0);
    }

    #[test]
    fn test_tolerance_points_equal() {
        let tol = Tolerance::DEFAULT;
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0 + 1e-7, 2.0, 3.0);
        assert!(tol.points_equal(&a, &b));
        let c = Point3::new(1.001, 2.0, 3.0);
        assert!(!tol.points_equal(&a, &c));
    }

    #[test]
    fn test_tolerance_in_domain() {
        let tol = Tolerance::DEFAULT;
        assert!(tol.in_domain(0.0, 0.0, 4.0));
        assert!(tol.in_domain(4.0 + 1e-12, 0.0, 4.0));
        assert!(!tol.in_domain(4.001, 0.0, 4.0));
        assert!(!tol.in_domain(-0.5, 0.0, 4.0));
    }
}
