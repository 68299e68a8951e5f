//! lbfgs::types — shared numeric aliases, defaults, and argmin wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types, default constants, and argmin solver
//! aliases used by the L-BFGS stack, so the remaining modules stay
//! agnostic to `ndarray` and argmin generics.
//!
//! Key behaviors
//! -------------
//! - Define canonical aliases for points, gradients, and scalar values
//!   (`Theta`, `Grad`, `Cost`).
//! - Collect the default configuration constants of the minimizer and the
//!   backtracking line searcher in one place.
//! - Expose a pre-wired argmin L-BFGS alias used by the reference solver.
//!
//! Conventions
//! -----------
//! - `Theta` and `Grad` always have length `DifferentiableFunction::dimension()`.
//! - Defaults mirror the long-standing behavior of the minimizer: a short
//!   iteration budget (20), five curvature pairs, a gentle first-iteration
//!   shrink factor (0.01) and halving afterwards.
use argmin::solver::{linesearch::MoreThuenteLineSearch, quasinewton::LBFGS};
use ndarray::Array1;
use std::collections::HashMap;

/// Parameter vector (point) being optimized.
pub type Theta = Array1<f64>;

/// Gradient vector, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// Function-evaluation counters as reported by argmin.
pub type FnEvalMap = HashMap<String, u64>;

// ---- Minimizer defaults ----

/// Default outer-iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Default number of retained curvature pairs.
pub const DEFAULT_HISTORY_SIZE: usize = 5;

/// Step multiplier applied on the very first outer iteration.
pub const DEFAULT_INITIAL_STEP_SIZE_MULTIPLIER: f64 = 0.01;

/// Step multiplier applied on every later outer iteration.
pub const DEFAULT_STEP_SIZE_MULTIPLIER: f64 = 0.5;

/// Guard added to the relative-change denominator in the convergence test.
pub const CONVERGENCE_EPS: f64 = 1e-10;

// ---- Line-search defaults ----

pub const DEFAULT_INITIAL_STEP_SIZE: f64 = 1.0;

/// Armijo constant `c`.
pub const DEFAULT_SUFFICIENT_DECREASE: f64 = 1e-4;

/// Acceptance slack and underflow threshold.
pub const LINE_SEARCH_EPS: f64 = 1e-10;

// ---- argmin wiring ----

/// More–Thuente line search specialized to this crate's numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// argmin L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
