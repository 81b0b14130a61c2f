#![warn(missing_docs)]

//! Freeform bodies fitted through structured point grids.
//!
//! A [`FreeformGrid`] of `imax × jmax × kmax` points becomes a wire (one
//! cubic curve), a sheet (one bicubic surface) or a brick (six surfaces,
//! twelve curves, eight corner nodes) depending on its dimensions. The
//! fitting itself is done by `csm-fit` against the in-process
//! [`NativeKernel`](csm_kernel_nurbs::NativeKernel).
//!
//! # Example
//!
//! ```
//! use csm_freeform::{build_freeform, FreeformBody, FreeformGrid, FreeformOptions};
//! use csm_kernel_math::Point3;
//!
//! let grid = FreeformGrid::from_fn(4, 3, 1, |i, j, _| {
//!     Point3::new(i as f64, j as f64, 0.1 * (i * j) as f64)
//! })
//! .unwrap();
//! let body = build_freeform(&grid, &FreeformOptions::default()).unwrap();
//! assert!(matches!(body, FreeformBody::Sheet(_)));
//! assert!(body.converged());
//! ```

mod brick;
pub mod grid;
pub mod options;

pub use brick::{BrickEdge, BrickFace, BrickSide, FaceSense, FreeformBrick};
pub use csm_fit::{FitError, FitStatus, Result};
pub use grid::{BodyKind, FreeformGrid, GridAxis};
pub use options::FreeformOptions;

use csm_fit::{fit_curve, fit_surface, Fit};
use csm_kernel_nurbs::{BSplineCurve, BSplineSurface, NativeKernel};
use log::{info, warn};

/// A fitted freeform body.
#[derive(Debug)]
pub enum FreeformBody {
    /// Curve through a single row of points.
    Wire(Fit<BSplineCurve>),
    /// Surface through a single layer of points.
    Sheet(Fit<BSplineSurface>),
    /// Faces and edges of a 3D block of points.
    Brick(Box<FreeformBrick>),
}

impl FreeformBody {
    /// Kind of this body.
    pub fn kind(&self) -> BodyKind {
        match self {
            FreeformBody::Wire(_) => BodyKind::Wire,
            FreeformBody::Sheet(_) => BodyKind::Sheet,
            FreeformBody::Brick(_) => BodyKind::Brick,
        }
    }

    /// Whether every fit that went into this body converged.
    pub fn converged(&self) -> bool {
        match self {
            FreeformBody::Wire(fit) => fit.converged(),
            FreeformBody::Sheet(fit) => fit.converged(),
            FreeformBody::Brick(brick) => brick.converged(),
        }
    }
}

/// Fit a freeform body through `grid`.
///
/// # Errors
///
/// [`FitError::InvalidOptions`] for bad options; otherwise the first error
/// raised by any of the underlying fits.
pub fn build_freeform(grid: &FreeformGrid, options: &FreeformOptions) -> Result<FreeformBody> {
    options.validate()?;
    let (imax, jmax, kmax) = grid.dims();
    info!("building freeform {:?} from {}x{}x{} grid", grid.kind(), imax, jmax, kmax);

    let body = match grid.kind() {
        BodyKind::Wire => {
            let mut kernel = NativeKernel::new();
            let fit = fit_curve(&mut kernel, grid.points(), &options.fit)?;
            if !fit.converged() {
                warn!("freeform wire did not converge");
            }
            FreeformBody::Wire(fit)
        }
        BodyKind::Sheet => {
            let slice = grid.slice(GridAxis::K, 0)?;
            let mut kernel = NativeKernel::new();
            let fit = fit_surface(&mut kernel, &slice, &options.fit)?;
            if !fit.converged() {
                warn!("freeform sheet did not converge");
            }
            FreeformBody::Sheet(fit)
        }
        BodyKind::Brick => FreeformBody::Brick(Box::new(brick::build_brick(
            grid,
            &options.fit,
            options.parallel,
        )?)),
    };

    info!(
        "freeform {:?} done, converged = {}",
        body.kind(),
        body.converged()
    );
    Ok(body)
}
