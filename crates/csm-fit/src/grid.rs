//! Rectangular grids of data points.

use std::ops::Index;

use csm_kernel_math::Point3;

use crate::error::{FitError, Result};

/// An `n_u × n_v` grid of points to be interpolated by a surface.
///
/// Stored row-major with `u` varying fastest: `points[j * n_u + i]` is the
/// point at column `i`, row `j`. Row 0 is the south boundary, row `n_v - 1`
/// the north boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGrid {
    points: Vec<Point3>,
    n_u: usize,
    n_v: usize,
}

impl PointGrid {
    /// Wrap a row-major point list. Both dimensions must be at least 2.
    pub fn new(points: Vec<Point3>, n_u: usize, n_v: usize) -> Result<Self> {
        if n_u < 2 || n_v < 2 {
            return Err(FitError::InvalidInput(format!(
                "surface fit needs at least 2x2 points, got {}x{}",
                n_u, n_v
            )));
        }
        if points.len() != n_u * n_v {
            return Err(FitError::InvalidInput(format!(
                "grid of {}x{} needs {} points, got {}",
                n_u,
                n_v,
                n_u * n_v,
                points.len()
            )));
        }
        Ok(Self { points, n_u, n_v })
    }

    /// Build a grid by sampling `f(i, j)`.
    pub fn from_fn(n_u: usize, n_v: usize, mut f: impl FnMut(usize, usize) -> Point3) -> Result<Self> {
        let points = (0..n_v)
            .flat_map(|j| (0..n_u).map(move |i| (i, j)))
            .map(|(i, j)| f(i, j))
            .collect();
        Self::new(points, n_u, n_v)
    }

    /// Points along `u`.
    pub fn n_u(&self) -> usize {
        self.n_u
    }

    /// Points along `v`.
    pub fn n_v(&self) -> usize {
        self.n_v
    }

    /// Row-major point storage.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Point at column `i`, row `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<&Point3> {
        if i < self.n_u && j < self.n_v {
            self.points.get(j * self.n_u + i)
        } else {
            None
        }
    }

    /// Row `j` (constant `v`), ordered by increasing `u`.
    pub fn row(&self, j: usize) -> &[Point3] {
        &self.points[j * self.n_u..(j + 1) * self.n_u]
    }

    /// Column `i` (constant `u`), ordered by increasing `v`.
    pub fn column(&self, i: usize) -> Vec<Point3> {
        (0..self.n_v).map(|j| self[(i, j)]).collect()
    }
}

impl Index<(usize, usize)> for PointGrid {
    type Output = Point3;

    fn index(&self, (i, j): (usize, usize)) -> &Point3 {
        assert!(i < self.n_u && j < self.n_v, "grid index ({}, {}) out of range", i, j);
        &self.points[j * self.n_u + i]
    }
}
