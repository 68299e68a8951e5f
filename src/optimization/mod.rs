//! optimization — L-BFGS stack, vector helpers, logging, and unified errors.
//!
//! Purpose
//! -------
//! Provide a self-contained unconstrained minimization layer: callers supply
//! a differentiable objective and a starting point and get back a fitted
//! parameter vector with diagnostics, without touching solver internals.
//!
//! Key behaviors
//! -------------
//! - `lbfgs`: the minimizer, its line search, curvature history, caching
//!   decorator, gradient checker and argmin reference solver.
//! - `vector_ops`: dense `f64` vector primitives used by the solver.
//! - `logging`: slog loggers; silent by default.
//! - `errors`: a single [`OptError`](errors::OptError) enum with the
//!   [`OptResult`](errors::OptResult) alias for every fallible operation.
//!
//! Conventions
//! -----------
//! - Objectives are always minimized.
//! - Points and gradients are `ndarray::Array1<f64>` (`Theta`, `Grad`).
//! - Library code never prints; diagnostics go through the `slog::Logger`
//!   installed on the minimizer.
//!
//! Downstream usage
//! ----------------
//! - Front-ends typically import `optimization::prelude::*`, which forwards
//!   the `lbfgs` prelude and the error types.

pub mod errors;
pub mod lbfgs;
pub mod logging;
pub mod vector_ops;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_lbfgs::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::lbfgs::prelude::*;
}
