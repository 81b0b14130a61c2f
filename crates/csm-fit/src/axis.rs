//! Per-direction bookkeeping shared by the curve and surface fitters.
//!
//! Along one parametric direction with `n` data points the fit owns `n + 2`
//! control points. Each control index is paired with the condition it is
//! adjusted to satisfy (its *lane*):
//!
//! | control index | lane                          |
//! |---------------|-------------------------------|
//! | `0`           | data point `0` (fixed)        |
//! | `1`           | slope at the start            |
//! | `2..n`        | data point `c - 1`            |
//! | `n`           | slope at the finish           |
//! | `n + 1`       | data point `n - 1` (fixed)    |

use csm_kernel_math::Point3;

use crate::DEGREE;

/// End of a parametric direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum End {
    Start,
    Finish,
}

impl End {
    /// Sign applied to a relaxed slope update. The start slope is controlled
    /// by moving the second control point forward, the finish slope by moving
    /// the second-to-last one backward.
    pub(crate) fn sign(self) -> f64 {
        match self {
            End::Start => 1.0,
            End::Finish => -1.0,
        }
    }
}

/// Condition a control index is adjusted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lane {
    /// Interpolate data point `k`.
    Data(usize),
    /// Match the chord slope at one end.
    Slope(End),
}

/// Knots and lane layout for one direction of `n` data points.
#[derive(Debug, Clone)]
pub(crate) struct Axis {
    n: usize,
    knots: Vec<f64>,
}

impl Axis {
    /// Uniform, clamped cubic knot vector over `[0, n - 1]` with one span per
    /// gap between data points. Requires `n >= 2`.
    pub(crate) fn new(n: usize) -> Self {
        debug_assert!(n >= 2);
        let last = (n - 1) as f64;
        let knots = std::iter::repeat(0.0)
            .take(DEGREE + 1)
            .chain((1..n - 1).map(|k| k as f64))
            .chain(std::iter::repeat(last).take(DEGREE + 1))
            .collect();
        Self { n, knots }
    }

    /// Data point count.
    pub(crate) fn n(&self) -> usize {
        self.n
    }

    /// Control point count, `n + 2`.
    pub(crate) fn n_control(&self) -> usize {
        self.n + 2
    }

    pub(crate) fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Lane of control index `c`.
    pub(crate) fn lane(&self, c: usize) -> Lane {
        let n = self.n;
        match c {
            0 => Lane::Data(0),
            1 => Lane::Slope(End::Start),
            c if c == n => Lane::Slope(End::Finish),
            c if c == n + 1 => Lane::Data(n - 1),
            c => Lane::Data(c - 1),
        }
    }

    /// Parameter value of data point `k`.
    pub(crate) fn data_param(&self, k: usize) -> f64 {
        self.knots[DEGREE + k]
    }

    /// Parameter value of one end of the domain.
    pub(crate) fn end_param(&self, end: End) -> f64 {
        match end {
            End::Start => self.data_param(0),
            End::Finish => self.data_param(self.n - 1),
        }
    }

    /// Parameter at which a lane's condition is evaluated.
    pub(crate) fn lane_param(&self, lane: Lane) -> f64 {
        match lane {
            Lane::Data(k) => self.data_param(k),
            Lane::Slope(end) => self.end_param(end),
        }
    }

    /// Knot span adjacent to an end; scales a derivative into a chord.
    pub(crate) fn end_span(&self, end: End) -> f64 {
        match end {
            End::Start => self.knots[DEGREE + 1] - self.knots[DEGREE],
            End::Finish => self.knots[DEGREE + self.n - 1] - self.knots[DEGREE + self.n - 2],
        }
    }

    /// Data indices `(later, earlier)` of the chord at an end.
    pub(crate) fn end_chord(&self, end: End) -> (usize, usize) {
        match end {
            End::Start => (1, 0),
            End::Finish => (self.n - 1, self.n - 2),
        }
    }

    /// Initial-guess weights of control index `c` over the data points.
    ///
    /// The two slope lanes start a quarter of the way along the end chords;
    /// every other control point starts on its data point.
    pub(crate) fn seed_weights(&self, c: usize) -> [(usize, f64); 2] {
        match self.lane(c) {
            Lane::Data(k) => [(k, 1.0), (k, 0.0)],
            Lane::Slope(end) => {
                let (later, earlier) = self.end_chord(end);
                match end {
                    End::Start => [(earlier, 0.75), (later, 0.25)],
                    End::Finish => [(earlier, 0.25), (later, 0.75)],
                }
            }
        }
    }
}

/// Warn about adjacent coincident points, which make the chord slopes vanish.
pub(crate) fn warn_coincident<'a>(what: &str, points: impl IntoIterator<Item = &'a Point3>) {
    let tol = csm_kernel_math::Tolerance::DEFAULT;
    let mut prev: Option<&Point3> = None;
    for (k, p) in points.into_iter().enumerate() {
        if let Some(q) = prev {
            if tol.points_equal(p, q) {
                log::warn!("{}: points {} and {} coincide", what, k - 1, k);
            }
        }
        prev = Some(p);
    }
}
