//! Bicubic B-spline surface through a rectangular grid of points.
//!
//! The control net has `(n_u + 2) × (n_v + 2)` points. Along each direction
//! the control indices follow the same lanes as the curve fitter (see
//! `axis`), and the pair of lanes at a control point picks its condition:
//!
//! | u lane  | v lane  | condition                                  |
//! |---------|---------|--------------------------------------------|
//! | data    | data    | interpolate the grid point                 |
//! | slope   | data    | `∂S/∂u` matches the `u` chord at that row  |
//! | data    | slope   | `∂S/∂v` matches the `v` chord at that column |
//! | slope   | slope   | `∂²S/∂u∂v` vanishes at that corner         |
//!
//! The four corner control points sit on the grid corners and never move.

use csm_kernel_geom::{GeometryError, GeometryKernel};
use csm_kernel_math::{max_abs_component, weighted_sum, Point2, Point3};
use log::trace;

use crate::axis::{warn_coincident, Axis, End, Lane};
use crate::error::Result;
use crate::grid::PointGrid;
use crate::options::FitOptions;
use crate::{report, Fit, FitStatus, DEGREE};

// =============================================================================
// Row rules
// =============================================================================

/// Update rule for one row (constant `v` control index) of the control net.
///
/// Rows are swept south to north. The boundary rows carry the fixed corner
/// control points; the rows next to them carry the `v` slope conditions and,
/// at their ends, the corner twist conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRule {
    /// Control row 0: interpolates data row 0.
    South,
    /// Control row 1: matches the `v` slope at the south edge.
    SouthInterior,
    /// Interpolates the given interior data row.
    InteriorRow(usize),
    /// Control row `n_v`: matches the `v` slope at the north edge.
    NorthInterior,
    /// Control row `n_v + 1`: interpolates data row `n_v - 1`.
    North,
}

impl RowRule {
    /// Rule for control row `cv` of a fit with `n_v` data rows.
    pub fn for_row(cv: usize, n_v: usize) -> Self {
        match cv {
            0 => RowRule::South,
            1 => RowRule::SouthInterior,
            c if c == n_v => RowRule::NorthInterior,
            c if c == n_v + 1 => RowRule::North,
            c => RowRule::InteriorRow(c - 1),
        }
    }

    /// Whether this row holds two of the fixed corner control points.
    pub fn is_boundary(self) -> bool {
        matches!(self, RowRule::South | RowRule::North)
    }

    fn v_lane(self, axis_v: &Axis) -> Lane {
        match self {
            RowRule::South => Lane::Data(0),
            RowRule::SouthInterior => Lane::Slope(End::Start),
            RowRule::InteriorRow(j) => Lane::Data(j),
            RowRule::NorthInterior => Lane::Slope(End::Finish),
            RowRule::North => Lane::Data(axis_v.n() - 1),
        }
    }
}

// =============================================================================
// Fitting loop
// =============================================================================

/// Fit a bicubic B-spline surface through `grid`.
///
/// Grid column `i` sits at `u = i` and row `j` at `v = j` over uniform
/// clamped knot vectors built as in [`fit_curve`](crate::fit_curve). The
/// surface passes exactly through the four grid corners, interpolates the
/// other grid points to within `options.tolerance`, matches the chord
/// slopes across all four edges, and has zero twist at the corners.
///
/// Returns the fitted surface whether or not the loop converged; check
/// [`Fit::status`]. Every intermediate surface is destroyed through
/// `kernel`, and on error no handle is left alive.
///
/// # Errors
///
/// [`FitError::InvalidOptions`](crate::FitError::InvalidOptions) for bad
/// options and [`FitError::Geometry`](crate::FitError::Geometry) when the
/// kernel fails.
pub fn fit_surface<K: GeometryKernel>(
    kernel: &mut K,
    grid: &PointGrid,
    options: &FitOptions,
) -> Result<Fit<K::Surface>> {
    options.validate()?;
    for j in 0..grid.n_v() {
        warn_coincident("surface fit row", grid.row(j));
    }
    for i in 0..grid.n_u() {
        warn_coincident("surface fit column", &grid.column(i));
    }

    let axis_u = Axis::new(grid.n_u());
    let axis_v = Axis::new(grid.n_v());
    let mut control_points = seed(&axis_u, &axis_v, grid);

    let mut surface =
        kernel.make_surface(DEGREE, axis_u.knots(), axis_v.knots(), &control_points)?;
    let mut status = FitStatus::default();

    for iteration in 1..=options.max_iterations {
        let residual = match relax(
            kernel,
            &surface,
            (&axis_u, &axis_v),
            grid,
            &mut control_points,
            options.relaxation,
        ) {
            Ok(r) => r,
            Err(e) => {
                kernel.destroy_surface(surface);
                return Err(e.into());
            }
        };
        status.iterations = iteration;
        status.max_residual = residual;
        trace!("surface fit iteration {}: residual {:.3e}", iteration, residual);

        if residual < options.tolerance {
            status.converged = true;
            break;
        }

        kernel.destroy_surface(surface);
        surface = kernel.make_surface(DEGREE, axis_u.knots(), axis_v.knots(), &control_points)?;
    }

    report("surface", &status, options);
    Ok(Fit {
        geometry: surface,
        status,
    })
}

/// Initial control net: the tensor product of the per-direction seeds.
fn seed(axis_u: &Axis, axis_v: &Axis, grid: &PointGrid) -> Vec<Point3> {
    let mut control_points = Vec::with_capacity(axis_u.n_control() * axis_v.n_control());
    for cv in 0..axis_v.n_control() {
        let wv = axis_v.seed_weights(cv);
        for cu in 0..axis_u.n_control() {
            let wu = axis_u.seed_weights(cu);
            let terms = wv
                .iter()
                .flat_map(|&(j, b)| wu.iter().map(move |&(i, a)| (a * b, i, j)));
            control_points.push(weighted_sum(terms.map(|(w, i, j)| (w, &grid[(i, j)]))));
        }
    }
    control_points
}

/// One relaxation sweep over the control net, south row first.
///
/// All conditions are evaluated on `surface` before any update lands.
/// Returns the largest residual component.
fn relax<K: GeometryKernel>(
    kernel: &K,
    surface: &K::Surface,
    (axis_u, axis_v): (&Axis, &Axis),
    grid: &PointGrid,
    control_points: &mut [Point3],
    relaxation: f64,
) -> std::result::Result<f64, GeometryError> {
    let n_cu = axis_u.n_control();
    let mut max_residual = 0.0_f64;

    for cv in 0..axis_v.n_control() {
        let rule = RowRule::for_row(cv, axis_v.n());
        let v_lane = rule.v_lane(axis_v);
        let v = axis_v.lane_param(v_lane);

        for cu in 0..n_cu {
            if rule.is_boundary() && (cu == 0 || cu == n_cu - 1) {
                continue;
            }
            let u_lane = axis_u.lane(cu);
            let uv = Point2::new(axis_u.lane_param(u_lane), v);
            let eval = kernel.evaluate_surface(surface, uv)?;

            let (residual, step) = match (u_lane, v_lane) {
                (Lane::Data(i), Lane::Data(j)) => (grid[(i, j)] - eval.point, 1.0),
                (Lane::Slope(end), Lane::Data(j)) => {
                    let (later, earlier) = axis_u.end_chord(end);
                    let chord = grid[(later, j)] - grid[(earlier, j)];
                    (chord - eval.du * axis_u.end_span(end), relaxation * end.sign())
                }
                (Lane::Data(i), Lane::Slope(end)) => {
                    let (later, earlier) = axis_v.end_chord(end);
                    let chord = grid[(i, later)] - grid[(i, earlier)];
                    (chord - eval.dv * axis_v.end_span(end), relaxation * end.sign())
                }
                (Lane::Slope(end_u), Lane::Slope(end_v)) => {
                    let scale = axis_u.end_span(end_u) * axis_v.end_span(end_v);
                    (
                        -(eval.duv * scale),
                        relaxation * end_u.sign() * end_v.sign(),
                    )
                }
            };

            control_points[cv * n_cu + cu] += residual * step;
            max_residual = max_residual.max(max_abs_component(&residual));
        }
    }

    Ok(max_residual)
}
