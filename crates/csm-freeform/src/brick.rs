//! Six-faced bodies fitted through a 3D point grid.

use csm_fit::{fit_curve, fit_surface, Fit, FitOptions, Result};
use csm_kernel_geom::Surface;
use csm_kernel_math::{weighted_sum, Point2, Point3};
use csm_kernel_nurbs::{BSplineCurve, BSplineSurface, NativeKernel};
use log::warn;
use rayon::prelude::*;

use crate::grid::{FreeformGrid, GridAxis};

/// Boundary plane of a brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrickSide {
    /// `i = 0`.
    IMin,
    /// `i = imax - 1`.
    IMax,
    /// `j = 0`.
    JMin,
    /// `j = jmax - 1`.
    JMax,
    /// `k = 0`.
    KMin,
    /// `k = kmax - 1`.
    KMax,
}

impl BrickSide {
    /// All six sides, in face order.
    pub const ALL: [BrickSide; 6] = [
        BrickSide::IMin,
        BrickSide::IMax,
        BrickSide::JMin,
        BrickSide::JMax,
        BrickSide::KMin,
        BrickSide::KMax,
    ];

    /// Grid direction this side is normal to.
    pub fn normal_axis(self) -> GridAxis {
        match self {
            BrickSide::IMin | BrickSide::IMax => GridAxis::I,
            BrickSide::JMin | BrickSide::JMax => GridAxis::J,
            BrickSide::KMin | BrickSide::KMax => GridAxis::K,
        }
    }

    /// Grid index of this side along its normal axis.
    pub fn index_in(self, grid: &FreeformGrid) -> usize {
        match self {
            BrickSide::IMin | BrickSide::JMin | BrickSide::KMin => 0,
            _ => grid.len_along(self.normal_axis()) - 1,
        }
    }
}

/// Orientation of a face relative to the brick it bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSense {
    /// `S_u × S_v` points out of the brick.
    Forward,
    /// `S_u × S_v` points into the brick.
    Reverse,
}

/// A fitted brick face.
#[derive(Debug)]
pub struct BrickFace {
    /// Which boundary plane this face lies on.
    pub side: BrickSide,
    /// Normal orientation of `fit.geometry`.
    pub sense: FaceSense,
    /// Surface through the grid slice, parameterized as in
    /// [`FreeformGrid::slice`].
    pub fit: Fit<BSplineSurface>,
}

/// A fitted brick edge.
#[derive(Debug)]
pub struct BrickEdge {
    /// Direction the edge runs in.
    pub direction: GridAxis,
    /// Grid node the edge starts at.
    pub start: [usize; 3],
    /// Curve through the grid points along the edge.
    pub fit: Fit<BSplineCurve>,
}

/// Faces, edges and corner nodes of a brick.
#[derive(Debug)]
pub struct FreeformBrick {
    /// One face per [`BrickSide`], in [`BrickSide::ALL`] order.
    pub faces: Vec<BrickFace>,
    /// Four edges along each of `I`, `J`, `K`.
    pub edges: Vec<BrickEdge>,
    /// Corner nodes, indexed `i_bit + 2 * j_bit + 4 * k_bit`.
    pub corners: [Point3; 8],
}

impl FreeformBrick {
    /// Whether every face and edge fit converged.
    pub fn converged(&self) -> bool {
        self.faces.iter().all(|f| f.fit.converged()) && self.edges.iter().all(|e| e.fit.converged())
    }

    /// Face on the given side.
    pub fn face(&self, side: BrickSide) -> Option<&BrickFace> {
        self.faces.iter().find(|f| f.side == side)
    }

    /// Edge running along `direction` from grid node `start`.
    pub fn edge(&self, direction: GridAxis, start: [usize; 3]) -> Option<&BrickEdge> {
        self.edges
            .iter()
            .find(|e| e.direction == direction && e.start == start)
    }
}

/// Start nodes of the twelve edges.
fn edge_starts(grid: &FreeformGrid) -> Vec<(GridAxis, [usize; 3])> {
    let (imax, jmax, kmax) = grid.dims();
    let (i1, j1, k1) = (imax - 1, jmax - 1, kmax - 1);
    let mut starts = Vec::with_capacity(12);
    for (a, b) in [(0, 0), (j1, 0), (0, k1), (j1, k1)] {
        starts.push((GridAxis::I, [0, a, b]));
    }
    for (a, b) in [(0, 0), (i1, 0), (0, k1), (i1, k1)] {
        starts.push((GridAxis::J, [a, 0, b]));
    }
    for (a, b) in [(0, 0), (i1, 0), (0, j1), (i1, j1)] {
        starts.push((GridAxis::K, [a, b, 0]));
    }
    starts
}

fn corners(grid: &FreeformGrid) -> [Point3; 8] {
    let (imax, jmax, kmax) = grid.dims();
    std::array::from_fn(|c| {
        let i = if c & 1 == 0 { 0 } else { imax - 1 };
        let j = if c & 2 == 0 { 0 } else { jmax - 1 };
        let k = if c & 4 == 0 { 0 } else { kmax - 1 };
        grid[(i, j, k)]
    })
}

/// Run independent fits, optionally on the rayon pool.
fn run_all<J, T, F>(jobs: &[J], parallel: bool, f: F) -> Result<Vec<T>>
where
    J: Sync,
    T: Send,
    F: Fn(&J) -> Result<T> + Sync + Send,
{
    if parallel {
        jobs.par_iter().map(&f).collect()
    } else {
        jobs.iter().map(&f).collect()
    }
}

/// Decide a face's sense from its normal at the middle of its domain.
fn face_sense(surface: &BSplineSurface, centroid: &Point3) -> FaceSense {
    let ((u0, u1), (v0, v1)) = surface.parameter_domain();
    let mid = Point2::new(0.5 * (u0 + u1), 0.5 * (v0 + v1));
    let outward = surface.evaluate(mid) - centroid;
    if surface.normal(mid).dot(&outward) >= 0.0 {
        FaceSense::Forward
    } else {
        FaceSense::Reverse
    }
}

/// Fit the six faces and twelve edges of a brick grid.
///
/// Every fit gets its own kernel context. A fit that fails aborts the whole
/// build; one that runs out of iterations is kept and logged.
pub(crate) fn build_brick(
    grid: &FreeformGrid,
    options: &FitOptions,
    parallel: bool,
) -> Result<FreeformBrick> {
    let corners = corners(grid);
    let centroid = weighted_sum(corners.iter().map(|p| (0.125, p)));

    let faces = run_all(&BrickSide::ALL, parallel, |&side| {
        let slice = grid.slice(side.normal_axis(), side.index_in(grid))?;
        let mut kernel = NativeKernel::new();
        let fit = fit_surface(&mut kernel, &slice, options)?;
        if !fit.converged() {
            warn!("brick face {:?} did not converge", side);
        }
        Ok(BrickFace {
            side,
            sense: face_sense(&fit.geometry, &centroid),
            fit,
        })
    })?;

    let edges = run_all(&edge_starts(grid), parallel, |&(direction, start)| {
        let points = grid.line(direction, start);
        let mut kernel = NativeKernel::new();
        let fit = fit_curve(&mut kernel, &points, options)?;
        if !fit.converged() {
            warn!("brick edge {:?} from {:?} did not converge", direction, start);
        }
        Ok(BrickEdge {
            direction,
            start,
            fit,
        })
    })?;

    Ok(FreeformBrick {
        faces,
        edges,
        corners,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn warped_box() -> FreeformGrid {
        FreeformGrid::from_fn(4, 3, 3, |i, j, k| {
            let (x, y, z) = (i as f64, j as f64, k as f64);
            Point3::new(x + 0.1 * (y + z).sin(), 1.2 * y, 0.8 * z + 0.05 * x * y)
        })
        .unwrap()
    }

    #[test]
    fn test_brick_topology() {
        let grid = warped_box();
        let brick = build_brick(&grid, &FitOptions::default(), false).unwrap();
        assert!(brick.converged());
        assert_eq!(brick.faces.len(), 6);
        assert_eq!(brick.edges.len(), 12);
        for (face, side) in brick.faces.iter().zip(BrickSide::ALL) {
            assert_eq!(face.side, side);
        }
        assert_eq!(brick.corners[0], grid[(0, 0, 0)]);
        assert_eq!(brick.corners[7], grid[(3, 2, 2)]);
        assert_eq!(brick.corners[2], grid[(0, 2, 0)]);
    }

    #[test]
    fn test_face_senses() {
        let grid = warped_box();
        let brick = build_brick(&grid, &FitOptions::default(), false).unwrap();
        let sense = |side| brick.face(side).map(|f| f.sense);
        // (j, k), (i, k) and (i, j) slices have normals +x, -y and +z.
        assert_eq!(sense(BrickSide::IMin), Some(FaceSense::Reverse));
        assert_eq!(sense(BrickSide::IMax), Some(FaceSense::Forward));
        assert_eq!(sense(BrickSide::JMin), Some(FaceSense::Forward));
        assert_eq!(sense(BrickSide::JMax), Some(FaceSense::Reverse));
        assert_eq!(sense(BrickSide::KMin), Some(FaceSense::Reverse));
        assert_eq!(sense(BrickSide::KMax), Some(FaceSense::Forward));
    }

    #[test]
    fn test_faces_share_edges() {
        let grid = warped_box();
        let brick = build_brick(&grid, &FitOptions::default(), false).unwrap();

        // South boundary of the j = 0 face is the edge along i at j = k = 0.
        let face = brick.face(BrickSide::JMin).unwrap();
        let edge = brick.edge(GridAxis::I, [0, 0, 0]).unwrap();
        for s in 0..=30 {
            let u = s as f64 * 0.1;
            let on_face = face.fit.geometry.eval(u, 0.0);
            let on_edge = edge.fit.geometry.eval(u);
            assert_abs_diff_eq!((on_face - on_edge).norm(), 0.0, epsilon = 1e-6);
        }

        // West boundary of the k = kmax - 1 face is the edge along j at i = 0.
        let face = brick.face(BrickSide::KMax).unwrap();
        let edge = brick.edge(GridAxis::J, [0, 0, 2]).unwrap();
        for s in 0..=20 {
            let v = s as f64 * 0.1;
            let on_face = face.fit.geometry.eval(0.0, v);
            let on_edge = edge.fit.geometry.eval(v);
            assert_abs_diff_eq!((on_face - on_edge).norm(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid = warped_box();
        let options = FitOptions::default();
        let seq = build_brick(&grid, &options, false).unwrap();
        let par = build_brick(&grid, &options, true).unwrap();
        for (a, b) in seq.faces.iter().zip(&par.faces) {
            assert_eq!(a.side, b.side);
            assert_eq!(a.fit.status, b.fit.status);
            assert_eq!(a.fit.geometry.control_points, b.fit.geometry.control_points);
        }
        for (a, b) in seq.edges.iter().zip(&par.edges) {
            assert_eq!((a.direction, a.start), (b.direction, b.start));
            assert_eq!(a.fit.geometry.control_points, b.fit.geometry.control_points);
        }
    }

    #[test]
    fn test_edge_starts_cover_all_edges() {
        let grid = warped_box();
        let starts = edge_starts(&grid);
        assert_eq!(starts.len(), 12);
        for axis in [GridAxis::I, GridAxis::J, GridAxis::K] {
            assert_eq!(starts.iter().filter(|(a, _)| *a == axis).count(), 4);
        }
        assert!(starts.contains(&(GridAxis::K, [3, 2, 0])));
    }
}
