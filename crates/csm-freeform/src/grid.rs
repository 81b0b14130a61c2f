//! Structured `imax × jmax × kmax` point grids.

use std::ops::Index;

use csm_fit::{FitError, PointGrid, Result};
use csm_kernel_math::Point3;

/// One of the three grid index directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridAxis {
    /// Along `i`.
    I,
    /// Along `j`.
    J,
    /// Along `k`.
    K,
}

/// Kind of body a grid describes, decided by its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// A single row of points (`jmax == kmax == 1`).
    Wire,
    /// A single layer of points (`kmax == 1`).
    Sheet,
    /// A full 3D block of points.
    Brick,
}

/// Points of a freeform body, with `i` varying fastest:
/// `points[(k * jmax + j) * imax + i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeformGrid {
    imax: usize,
    jmax: usize,
    kmax: usize,
    points: Vec<Point3>,
}

impl FreeformGrid {
    /// Wrap a point list, checking its shape.
    ///
    /// A layered grid needs a second row before it can have a second layer,
    /// so `jmax == 1 && kmax > 1` is rejected.
    pub fn new(imax: usize, jmax: usize, kmax: usize, points: Vec<Point3>) -> Result<Self> {
        if imax == 0 || jmax == 0 || kmax == 0 {
            return Err(FitError::InvalidInput(format!(
                "freeform grid dimensions must be positive, got {}x{}x{}",
                imax, jmax, kmax
            )));
        }
        if jmax == 1 && kmax > 1 {
            return Err(FitError::InvalidInput(format!(
                "freeform grid with jmax = 1 cannot have kmax = {}",
                kmax
            )));
        }
        if points.len() != imax * jmax * kmax {
            return Err(FitError::InvalidInput(format!(
                "freeform grid of {}x{}x{} needs {} points, got {}",
                imax,
                jmax,
                kmax,
                imax * jmax * kmax,
                points.len()
            )));
        }
        Ok(Self {
            imax,
            jmax,
            kmax,
            points,
        })
    }

    /// Build a grid by sampling `f(i, j, k)`.
    pub fn from_fn(
        imax: usize,
        jmax: usize,
        kmax: usize,
        mut f: impl FnMut(usize, usize, usize) -> Point3,
    ) -> Result<Self> {
        let mut points = Vec::with_capacity(imax * jmax * kmax);
        for k in 0..kmax {
            for j in 0..jmax {
                for i in 0..imax {
                    points.push(f(i, j, k));
                }
            }
        }
        Self::new(imax, jmax, kmax, points)
    }

    /// Grid dimensions `(imax, jmax, kmax)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.imax, self.jmax, self.kmax)
    }

    /// Number of points along `axis`.
    pub fn len_along(&self, axis: GridAxis) -> usize {
        match axis {
            GridAxis::I => self.imax,
            GridAxis::J => self.jmax,
            GridAxis::K => self.kmax,
        }
    }

    /// Point storage, `i` fastest.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Body kind implied by the dimensions.
    pub fn kind(&self) -> BodyKind {
        match (self.jmax, self.kmax) {
            (1, 1) => BodyKind::Wire,
            (_, 1) => BodyKind::Sheet,
            _ => BodyKind::Brick,
        }
    }

    /// Points along `axis` starting from grid node `start`, whose
    /// coordinate along `axis` is ignored.
    pub fn line(&self, axis: GridAxis, start: [usize; 3]) -> Vec<Point3> {
        let [i, j, k] = start;
        match axis {
            GridAxis::I => (0..self.imax).map(|i| self[(i, j, k)]).collect(),
            GridAxis::J => (0..self.jmax).map(|j| self[(i, j, k)]).collect(),
            GridAxis::K => (0..self.kmax).map(|k| self[(i, j, k)]).collect(),
        }
    }

    /// The 2D slice at `index` across `normal`.
    ///
    /// The in-slice directions keep their grid order: across `I` the slice
    /// runs `(j, k)`, across `J` it runs `(i, k)`, across `K` it runs `(i, j)`.
    pub fn slice(&self, normal: GridAxis, index: usize) -> Result<PointGrid> {
        match normal {
            GridAxis::I => PointGrid::from_fn(self.jmax, self.kmax, |j, k| self[(index, j, k)]),
            GridAxis::J => PointGrid::from_fn(self.imax, self.kmax, |i, k| self[(i, index, k)]),
            GridAxis::K => PointGrid::from_fn(self.imax, self.jmax, |i, j| self[(i, j, index)]),
        }
    }
}

impl Index<(usize, usize, usize)> for FreeformGrid {
    type Output = Point3;

    fn index(&self, (i, j, k): (usize, usize, usize)) -> &Point3 {
        assert!(
            i < self.imax && j < self.jmax && k < self.kmax,
            "grid index ({}, {}, {}) out of range",
            i,
            j,
            k
        );
        &self.points[(k * self.jmax + j) * self.imax + i]
    }
}
