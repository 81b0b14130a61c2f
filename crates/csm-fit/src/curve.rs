//! Cubic B-spline curve through an ordered list of points.

use csm_kernel_geom::{GeometryError, GeometryKernel};
use csm_kernel_math::{max_abs_component, weighted_sum, Point3};
use log::trace;

use crate::axis::{warn_coincident, Axis, Lane};
use crate::error::{FitError, Result};
use crate::options::FitOptions;
use crate::{report, Fit, FitStatus, DEGREE};

/// Fit a cubic B-spline curve through `points`.
///
/// The curve has `points.len() + 2` control points over the uniform clamped
/// knot vector `[0, 0, 0, 0, 1, 2, …, n-2, n-1, n-1, n-1, n-1]`, so data
/// point `k` sits at parameter `k`. It passes exactly through the first and
/// last points, interpolates the rest to within `options.tolerance`, and its
/// end tangents match the first and last chords.
///
/// Returns the fitted curve whether or not the loop converged; check
/// [`Fit::status`]. Every intermediate curve is destroyed through `kernel`,
/// and on error no handle is left alive.
///
/// # Errors
///
/// [`FitError::InvalidInput`] for fewer than 2 points,
/// [`FitError::InvalidOptions`] for bad options, and
/// [`FitError::Geometry`] when the kernel fails.
pub fn fit_curve<K: GeometryKernel>(
    kernel: &mut K,
    points: &[Point3],
    options: &FitOptions,
) -> Result<Fit<K::Curve>> {
    options.validate()?;
    if points.len() < 2 {
        return Err(FitError::InvalidInput(format!(
            "curve fit needs at least 2 points, got {}",
            points.len()
        )));
    }
    warn_coincident("curve fit", points);

    let axis = Axis::new(points.len());
    let mut control_points: Vec<Point3> = (0..axis.n_control())
        .map(|c| {
            weighted_sum(
                axis.seed_weights(c)
                    .iter()
                    .map(|&(k, w)| (w, &points[k])),
            )
        })
        .collect();

    let mut curve = kernel.make_curve(DEGREE, axis.knots(), &control_points)?;
    let mut status = FitStatus::default();

    for iteration in 1..=options.max_iterations {
        let residual = match relax(
            kernel,
            &curve,
            &axis,
            points,
            &mut control_points,
            options.relaxation,
        ) {
            Ok(r) => r,
            Err(e) => {
                kernel.destroy_curve(curve);
                return Err(e.into());
            }
        };
        status.iterations = iteration;
        status.max_residual = residual;
        trace!("curve fit iteration {}: residual {:.3e}", iteration, residual);

        if residual < options.tolerance {
            status.converged = true;
            break;
        }

        kernel.destroy_curve(curve);
        curve = kernel.make_curve(DEGREE, axis.knots(), &control_points)?;
    }

    report("curve", &status, options);
    Ok(Fit {
        geometry: curve,
        status,
    })
}

/// One relaxation sweep.
///
/// Every condition is evaluated on the same `curve` before any control point
/// is moved, so the sweep order does not matter. Returns the largest
/// residual component.
fn relax<K: GeometryKernel>(
    kernel: &K,
    curve: &K::Curve,
    axis: &Axis,
    points: &[Point3],
    control_points: &mut [Point3],
    relaxation: f64,
) -> std::result::Result<f64, GeometryError> {
    let mut max_residual = 0.0_f64;

    // The first and last control points stay on the end data points.
    for c in 1..=axis.n() {
        let lane = axis.lane(c);
        let eval = kernel.evaluate_curve(curve, axis.lane_param(lane))?;
        let (residual, step) = match lane {
            Lane::Data(k) => (points[k] - eval.point, 1.0),
            Lane::Slope(end) => {
                let (later, earlier) = axis.end_chord(end);
                let chord = points[later] - points[earlier];
                (chord - eval.d1 * axis.end_span(end), relaxation * end.sign())
            }
        };
        control_points[c] += residual * step;
        max_residual = max_residual.max(max_abs_component(&residual));
    }

    Ok(max_residual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use csm_kernel_geom::{Curve3d, CurveDerivatives};
    use csm_kernel_math::Vec3;
    use csm_kernel_nurbs::{BSplineCurve, BSplineSurface, NativeKernel};

    fn helix(n: usize) -> Vec<Point3> {
        (0..n)
            .map(|k| {
                let t = k as f64 * 0.6;
                Point3::new(t.cos(), t.sin(), 0.3 * t)
            })
            .collect()
    }

    #[test]
    fn test_collinear_points_reproduce_line() {
        let mut kernel = NativeKernel::new();
        let pts: Vec<_> = (0..4).map(|k| Point3::new(k as f64, 0.0, 0.0)).collect();
        let fit = fit_curve(&mut kernel, &pts, &FitOptions::default()).unwrap();
        assert!(fit.converged());
        assert!(fit.status.iterations < 100);

        for s in 0..=30 {
            let t = s as f64 * 0.1;
            let p = fit.geometry.eval(t);
            assert_eq!(p.y, 0.0);
            assert_eq!(p.z, 0.0);
            assert!((p.x - t).abs() < 1e-6, "x({}) = {}", t, p.x);
        }
        kernel.destroy_curve(fit.geometry);
        assert_eq!(kernel.stats().live(), 0);
    }

    #[test]
    fn test_helix_interpolation() {
        let mut kernel = NativeKernel::new();
        let pts = helix(7);
        let fit = fit_curve(&mut kernel, &pts, &FitOptions::default()).unwrap();
        assert!(fit.converged());
        assert_eq!(fit.geometry.num_control_points(), 9);
        assert_eq!(fit.geometry.knots.len(), 13);
        assert_eq!(fit.geometry.parameter_domain(), (0.0, 6.0));

        for (k, p) in pts.iter().enumerate() {
            let d = (fit.geometry.eval(k as f64) - p).norm();
            assert!(d < 1e-6, "point {} misses by {}", k, d);
        }

        // End tangents follow the end chords.
        let start = fit.geometry.tangent(0.0) - (pts[1] - pts[0]);
        let finish = fit.geometry.tangent(6.0) - (pts[6] - pts[5]);
        assert!(start.amax() < 1e-6);
        assert!(finish.amax() < 1e-6);
        kernel.destroy_curve(fit.geometry);
    }

    #[test]
    fn test_endpoints_exact() {
        let mut kernel = NativeKernel::new();
        let pts = helix(5);
        let fit = fit_curve(&mut kernel, &pts, &FitOptions::default()).unwrap();
        assert_eq!(fit.geometry.eval(0.0), pts[0]);
        assert_eq!(fit.geometry.eval(4.0), pts[4]);
        assert_eq!(fit.geometry.control_points[0], pts[0]);
        assert_eq!(fit.geometry.control_points[6], pts[4]);
        kernel.destroy_curve(fit.geometry);
    }

    #[test]
    fn test_two_and_three_points() {
        for n in [2, 3] {
            let mut kernel = NativeKernel::new();
            let pts = helix(n);
            let fit = fit_curve(&mut kernel, &pts, &FitOptions::default()).unwrap();
            assert!(fit.converged(), "n = {}", n);
            assert_eq!(fit.geometry.num_control_points(), n + 2);
            let last = (n - 1) as f64;
            assert!((fit.geometry.eval(last) - pts[n - 1]).norm() < 1e-12);
            let chord = pts[n - 1] - pts[n - 2];
            assert!((fit.geometry.tangent(last) - chord).amax() < 1e-6);
            kernel.destroy_curve(fit.geometry);
            assert_eq!(kernel.stats().live(), 0);
        }
    }

    #[test]
    fn test_too_few_points() {
        let mut kernel = NativeKernel::new();
        for pts in [vec![], vec![Point3::origin()]] {
            assert!(matches!(
                fit_curve(&mut kernel, &pts, &FitOptions::default()),
                Err(FitError::InvalidInput(_))
            ));
        }
        assert_eq!(kernel.stats().created, 0);
    }

    #[test]
    fn test_invalid_options() {
        let mut kernel = NativeKernel::new();
        let options = FitOptions {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            fit_curve(&mut kernel, &helix(4), &options),
            Err(FitError::InvalidOptions(_))
        ));
        assert_eq!(kernel.stats().created, 0);
    }

    #[test]
    fn test_iteration_cap() {
        let mut kernel = NativeKernel::new();
        let options = FitOptions {
            max_iterations: 3,
            ..Default::default()
        };
        let fit = fit_curve(&mut kernel, &helix(6), &options).unwrap();
        assert!(!fit.converged());
        assert_eq!(fit.status.iterations, 3);
        assert!(fit.status.max_residual >= options.tolerance);

        // Initial build plus one rebuild per iteration; only the result is live.
        assert_eq!(kernel.stats().created, 4);
        assert_eq!(kernel.stats().live(), 1);
        kernel.destroy_curve(fit.geometry);
        assert_eq!(kernel.stats().live(), 0);
    }

    #[test]
    fn test_capped_residual_belongs_to_previous_curve() {
        let points = helix(6);
        let capped = |max_iterations| {
            let mut kernel = NativeKernel::new();
            let options = FitOptions {
                max_iterations,
                ..Default::default()
            };
            let fit = fit_curve(&mut kernel, &points, &options).unwrap();
            (kernel, fit)
        };
        let (kernel2, fit2) = capped(2);
        let (_, fit3) = capped(3);
        assert!(!fit3.converged());

        // The third sweep measures the curve that a two-iteration cap returns.
        let axis = Axis::new(points.len());
        let mut scratch = vec![Point3::origin(); axis.n_control()];
        let residual = relax(
            &kernel2,
            &fit2.geometry,
            &axis,
            &points,
            &mut scratch,
            FitOptions::default().relaxation,
        )
        .unwrap();
        assert_eq!(residual, fit3.status.max_residual);
        assert_ne!(fit2.geometry.control_points, fit3.geometry.control_points);
    }

    #[test]
    fn test_converged_fit_releases_intermediates() {
        let mut kernel = NativeKernel::new();
        let fit = fit_curve(&mut kernel, &helix(5), &FitOptions::default()).unwrap();
        assert!(fit.converged());
        // The converging iteration returns the curve it evaluated.
        assert_eq!(kernel.stats().created, fit.status.iterations);
        assert_eq!(kernel.stats().live(), 1);
        kernel.destroy_curve(fit.geometry);
    }

    #[test]
    fn test_non_finite_point_is_geometry_error() {
        let mut kernel = NativeKernel::new();
        let mut pts = helix(5);
        pts[2].y = f64::NAN;
        let err = fit_curve(&mut kernel, &pts, &FitOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            FitError::Geometry(GeometryError::NonFinite { .. })
        ));
        assert_eq!(kernel.stats().live(), 0);
    }

    /// Kernel whose evaluations start failing after a fixed number of calls.
    struct FlakyKernel {
        inner: NativeKernel,
        evaluations_left: std::cell::Cell<usize>,
    }

    impl GeometryKernel for FlakyKernel {
        type Curve = BSplineCurve;
        type Surface = BSplineSurface;

        fn make_curve(
            &mut self,
            degree: usize,
            knots: &[f64],
            cps: &[Point3],
        ) -> csm_kernel_geom::Result<BSplineCurve> {
            self.inner.make_curve(degree, knots, cps)
        }

        fn make_surface(
            &mut self,
            degree: usize,
            knots_u: &[f64],
            knots_v: &[f64],
            cps: &[Point3],
        ) -> csm_kernel_geom::Result<BSplineSurface> {
            self.inner.make_surface(degree, knots_u, knots_v, cps)
        }

        fn evaluate_curve(
            &self,
            curve: &BSplineCurve,
            t: f64,
        ) -> csm_kernel_geom::Result<CurveDerivatives> {
            match self.evaluations_left.get() {
                0 => Err(GeometryError::Kernel("evaluation failed".into())),
                left => {
                    self.evaluations_left.set(left - 1);
                    Ok(curve.derivatives(t))
                }
            }
        }

        fn destroy_curve(&mut self, curve: BSplineCurve) {
            self.inner.destroy_curve(curve);
        }

        fn destroy_surface(&mut self, surface: BSplineSurface) {
            self.inner.destroy_surface(surface);
        }
    }

    #[test]
    fn test_kernel_failure_mid_loop_releases_handles() {
        let mut kernel = FlakyKernel {
            inner: NativeKernel::new(),
            evaluations_left: std::cell::Cell::new(12),
        };
        let err = fit_curve(&mut kernel, &helix(5), &FitOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::Geometry(GeometryError::Kernel(_))));
        assert!(kernel.inner.stats().created > 1);
        assert_eq!(kernel.inner.stats().live(), 0);
    }

    #[test]
    fn test_coincident_points_still_fit() {
        let mut kernel = NativeKernel::new();
        let pts = vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let fit = fit_curve(&mut kernel, &pts, &FitOptions::default()).unwrap();
        assert_eq!(fit.geometry.eval(3.0), pts[3]);
        assert!(fit.geometry.tangent(0.0).dot(&Vec3::x()) > 0.0);
        kernel.destroy_curve(fit.geometry);
    }
}
