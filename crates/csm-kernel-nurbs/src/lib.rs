#![warn(missing_docs)]

//! B-spline evaluation for the CSM freeform kernel.
//!
//! Provides non-rational B-spline curves and tensor-product surfaces with
//! analytic first and second derivatives, and [`NativeKernel`], an
//! in-process implementation of the host [`GeometryKernel`] interface built
//! on them.
//!
//! # Key types
//!
//! - [`BSplineCurve`] — non-rational B-spline curve in 3D
//! - [`BSplineSurface`] — non-rational tensor-product B-spline surface
//! - [`NativeKernel`] — create/evaluate/destroy host kernel with leak accounting
//!
//! # Algorithms
//!
//! - Binary knot-span search
//! - Cox–de Boor basis recurrence with analytic basis derivatives
//!   (Piegl & Tiller, *The NURBS Book*, A2.3)
//!
//! [`GeometryKernel`]: csm_kernel_geom::GeometryKernel

mod kernel;

pub use kernel::{KernelStats, NativeKernel};

use csm_kernel_geom::{CurveDerivatives, GeometryError, Result, SurfaceDerivatives};
use csm_kernel_math::{Point2, Point3, Vec3};

// =============================================================================
// Knot vector utilities
// =============================================================================

/// Validate a knot vector against its control point count and degree.
///
/// Requires `degree ≥ 1`, at least `degree + 1` control points, length
/// `n_points + degree + 1`, finite non-decreasing values, and a domain
/// `[knots[degree], knots[n_points]]` of non-zero length.
fn validate_knots(knots: &[f64], n_points: usize, degree: usize) -> Result<()> {
    if degree == 0 {
        return Err(GeometryError::UnsupportedDegree(degree));
    }
    if n_points < degree + 1 {
        return Err(GeometryError::ControlPointCount {
            expected: degree + 1,
            found: n_points,
        });
    }
    if knots.len() != n_points + degree + 1 {
        return Err(GeometryError::KnotCount {
            expected: n_points + degree + 1,
            found: knots.len(),
        });
    }
    if let Some(index) = knots.iter().position(|k| !k.is_finite()) {
        return Err(GeometryError::NonFinite { what: "knot", index });
    }
    if let Some(index) = (1..knots.len()).find(|&i| knots[i] < knots[i - 1]) {
        return Err(GeometryError::DecreasingKnots { index });
    }
    let (min, max) = (knots[degree], knots[n_points]);
    if max <= min {
        return Err(GeometryError::EmptyDomain { min, max });
    }
    Ok(())
}

fn validate_points(points: &[Point3]) -> Result<()> {
    match points.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
        Some(index) => Err(GeometryError::NonFinite {
            what: "control point",
            index,
        }),
        None => Ok(()),
    }
}

/// Find the knot span index for parameter `t`.
///
/// Returns `i` such that `knots[i] <= t < knots[i+1]`, clamped to valid range.
/// For `t` at the end of the domain, returns the last valid span.
fn find_span(knots: &[f64], n: usize, degree: usize, t: f64) -> usize {
    // n = number of control points - 1 (last index)
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-zero basis functions and their derivatives at `t`.
///
/// Row `k` of the result holds the `k`-th derivatives of
/// `N[span-degree..=span]`. Rows above `degree` are identically zero.
fn basis_derivatives(
    knots: &[f64],
    span: usize,
    degree: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    // ndu: basis functions in the upper triangle, knot differences below.
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = if ndu[j][r].abs() < 1e-30 {
                0.0
            } else {
                ndu[r][j - 1] / ndu[j][r]
            };
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    let mut ders = vec![vec![0.0; p + 1]; order + 1];
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let top = order.min(p);
    let mut a = [vec![0.0; p + 1], vec![0.0; p + 1]];
    for r in 0..=p {
        let (mut s1, mut s2) = (0, 1);
        a[0][0] = 1.0;
        for k in 1..=top {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;
            if r >= k {
                a[s2][0] = a[s1][0] / ndu[pk + 1][r - k];
                d = a[s2][0] * ndu[r - k][pk];
            }
            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };
            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }
            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }
            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    let mut factor = p as f64;
    for k in 1..=top {
        for value in ders[k].iter_mut() {
            *value *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

// =============================================================================
// B-spline curve
// =============================================================================

/// A non-rational B-spline curve in 3D.
///
/// Defined by control points, a knot vector, and a polynomial degree.
#[derive(Debug, Clone)]
pub struct BSplineCurve {
    /// Control points in 3D.
    pub control_points: Vec<Point3>,
    /// Knot vector. Length = control_points.len() + degree + 1.
    pub knots: Vec<f64>,
    /// Polynomial degree (order = degree + 1).
    pub degree: usize,
}

impl BSplineCurve {
    /// Create a B-spline curve, validating the knot vector and control points.
    pub fn new(control_points: Vec<Point3>, knots: Vec<f64>, degree: usize) -> Result<Self> {
        validate_knots(&knots, control_points.len(), degree)?;
        validate_points(&control_points)?;
        Ok(Self {
            control_points,
            knots,
            degree,
        })
    }

    /// Position and derivatives up to `order` at `t`; entry 0 is the position
    /// vector, entry `k` the `k`-th derivative.
    pub fn derivs(&self, t: f64, order: usize) -> Vec<Vec3> {
        let n = self.control_points.len() - 1;
        let t = t.clamp(self.knots[self.degree], self.knots[n + 1]);
        let span = find_span(&self.knots, n, self.degree, t);
        let basis = basis_derivatives(&self.knots, span, self.degree, t, order);
        let first = span - self.degree;

        basis
            .iter()
            .map(|row| {
                row.iter().enumerate().fold(Vec3::zeros(), |acc, (i, &b)| {
                    acc + self.control_points[first + i].coords * b
                })
            })
            .collect()
    }

    /// Evaluate the curve at parameter `t`.
    pub fn eval(&self, t: f64) -> Point3 {
        Point3::from(self.derivs(t, 0)[0])
    }

    /// Tangent vector `dC/dt` at parameter `t`.
    pub fn tangent(&self, t: f64) -> Vec3 {
        self.derivs(t, 1)[1]
    }

    /// Parameter domain `(t_min, t_max)`.
    pub fn parameter_domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.control_points.len()],
        )
    }

    /// Number of control points.
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }
}

impl csm_kernel_geom::Curve3d for BSplineCurve {
    fn evaluate(&self, t: f64) -> Point3 {
        self.eval(t)
    }

    fn derivatives(&self, t: f64) -> CurveDerivatives {
        let d = self.derivs(t, 2);
        CurveDerivatives {
            point: Point3::from(d[0]),
            d1: d[1],
            d2: d[2],
        }
    }

    fn domain(&self) -> (f64, f64) {
        self.parameter_domain()
    }
}

// =============================================================================
// B-spline surface
// =============================================================================

/// A non-rational tensor-product B-spline surface.
///
/// Control points are stored in row-major order: `points[v_idx * n_u + u_idx]`.
#[derive(Debug, Clone)]
pub struct BSplineSurface {
    /// Control points in row-major order.
    pub control_points: Vec<Point3>,
    /// Number of control points in the u direction.
    pub n_u: usize,
    /// Number of control points in the v direction.
    pub n_v: usize,
    /// Knot vector in u. Length = n_u + degree_u + 1.
    pub knots_u: Vec<f64>,
    /// Knot vector in v. Length = n_v + degree_v + 1.
    pub knots_v: Vec<f64>,
    /// Polynomial degree in u.
    pub degree_u: usize,
    /// Polynomial degree in v.
    pub degree_v: usize,
}

impl BSplineSurface {
    /// Create a B-spline surface.
    ///
    /// `control_points` is in row-major order: `[v=0,u=0], [v=0,u=1], ..., [v=1,u=0], ...`
    pub fn new(
        control_points: Vec<Point3>,
        n_u: usize,
        n_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self> {
        if control_points.len() != n_u * n_v {
            return Err(GeometryError::ControlPointCount {
                expected: n_u * n_v,
                found: control_points.len(),
            });
        }
        validate_knots(&knots_u, n_u, degree_u)?;
        validate_knots(&knots_v, n_v, degree_v)?;
        validate_points(&control_points)?;
        Ok(Self {
            control_points,
            n_u,
            n_v,
            knots_u,
            knots_v,
            degree_u,
            degree_v,
        })
    }

    /// Get a control point at `(u_idx, v_idx)`.
    pub fn control_point(&self, u_idx: usize, v_idx: usize) -> &Point3 {
        &self.control_points[v_idx * self.n_u + u_idx]
    }

    /// Mixed partial derivatives at `(u, v)`.
    ///
    /// `result[k][l]` is `∂^(k+l) S / ∂u^k ∂v^l` for `k + l <= order`; the
    /// remaining entries are zero.
    pub fn derivs(&self, u: f64, v: f64, order: usize) -> Vec<Vec<Vec3>> {
        let nu = self.n_u - 1;
        let nv = self.n_v - 1;
        let u = u.clamp(self.knots_u[self.degree_u], self.knots_u[nu + 1]);
        let v = v.clamp(self.knots_v[self.degree_v], self.knots_v[nv + 1]);

        let span_u = find_span(&self.knots_u, nu, self.degree_u, u);
        let span_v = find_span(&self.knots_v, nv, self.degree_v, v);
        let basis_u = basis_derivatives(&self.knots_u, span_u, self.degree_u, u, order);
        let basis_v = basis_derivatives(&self.knots_v, span_v, self.degree_v, v, order);
        let first_u = span_u - self.degree_u;
        let first_v = span_v - self.degree_v;

        let mut out = vec![vec![Vec3::zeros(); order + 1]; order + 1];
        for (k, row_u) in basis_u.iter().enumerate() {
            for (l, row_v) in basis_v.iter().enumerate().take(order + 1 - k) {
                let mut acc = Vec3::zeros();
                for (j, &bv) in row_v.iter().enumerate() {
                    for (i, &bu) in row_u.iter().enumerate() {
                        acc += self.control_point(first_u + i, first_v + j).coords * (bu * bv);
                    }
                }
                out[k][l] = acc;
            }
        }
        out
    }

    /// Evaluate the surface at `(u, v)`.
    pub fn eval(&self, u: f64, v: f64) -> Point3 {
        Point3::from(self.derivs(u, v, 0)[0][0])
    }

    /// Partial derivative with respect to u.
    pub fn deriv_u(&self, u: f64, v: f64) -> Vec3 {
        self.derivs(u, v, 1)[1][0]
    }

    /// Partial derivative with respect to v.
    pub fn deriv_v(&self, u: f64, v: f64) -> Vec3 {
        self.derivs(u, v, 1)[0][1]
    }

    /// Mixed second partial `∂²S/∂u∂v`.
    pub fn deriv_uv(&self, u: f64, v: f64) -> Vec3 {
        self.derivs(u, v, 2)[1][1]
    }

    /// Parameter domain.
    pub fn parameter_domain(&self) -> ((f64, f64), (f64, f64)) {
        (
            (self.knots_u[self.degree_u], self.knots_u[self.n_u]),
            (self.knots_v[self.degree_v], self.knots_v[self.n_v]),
        )
    }
}

impl csm_kernel_geom::Surface for BSplineSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.eval(uv.x, uv.y)
    }

    fn derivatives(&self, uv: Point2) -> SurfaceDerivatives {
        let d = self.derivs(uv.x, uv.y, 2);
        SurfaceDerivatives {
            point: Point3::from(d[0][0]),
            du: d[1][0],
            dv: d[0][1],
            duu: d[2][0],
            duv: d[1][1],
            dvv: d[0][2],
        }
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        self.parameter_domain()
    }
}

// =============================================================================
// Tests
// =============================================================================
