//! lbfgs — limited-memory BFGS minimization with a backtracking line search.
//!
//! Purpose
//! -------
//! Minimize smooth, unconstrained objectives `f: ℝⁿ → ℝ` supplied through the
//! [`DifferentiableFunction`] contract. This module owns the whole solver:
//! curvature history, two-loop recursion, Armijo backtracking, convergence
//! logic with history resets, plus tooling around it (caching decorator,
//! empirical gradient checker, argmin reference solver).
//!
//! Key behaviors
//! -------------
//! - [`LbfgsMinimizer`] drives the outer loop and reports a
//!   [`MinimizeOutcome`] with a [`Termination`] state.
//! - [`BacktrackingLineSearcher`] returns a tagged [`LineSearchOutcome`]
//!   (accepted step, underflow, or trial cap) instead of signalling through
//!   flags alone.
//! - [`CachingDifferentiableFunction`] turns a [`JointObjective`] (value and
//!   gradient from one pass) into a [`DifferentiableFunction`] that computes
//!   each distinct point once.
//! - [`EmpiricalGradientTester`] compares analytic gradients with forward
//!   and central differences.
//! - [`reference_minimize`] runs argmin's L-BFGS on the same objective for
//!   cross-checking.
//!
//! Invariants & assumptions
//! ------------------------
//! - Objectives are deterministic and have a fixed dimension.
//! - All solver state is owned by one minimizer instance; nothing is global.
//! - Numerical trouble is handled inside the minimizer where possible
//!   (history resets); remaining failures surface as `OptError`.
//!
//! Downstream usage
//! ----------------
//! - Implement [`DifferentiableFunction`] (or [`JointObjective`] + the
//!   caching decorator), create an [`LbfgsMinimizer`], adjust options, call
//!   [`LbfgsMinimizer::minimize`].
//! - The Python bindings wrap a callable returning `(value, gradient)` as a
//!   [`JointObjective`].
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its local contract.
//! - `tests/integration_lbfgs_pipeline.rs` runs full minimizations and
//!   compares with [`reference_minimize`].

pub mod adapter;
pub mod cache;
pub mod gradient_check;
pub mod history;
pub mod line_search;
pub mod minimizer;
pub mod reference;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::cache::CachingDifferentiableFunction;
pub use self::gradient_check::{EmpiricalGradientTester, GradientCheckReport, GradientMismatch};
pub use self::history::{CurvatureHistory, CurvaturePair};
pub use self::line_search::{
    BacktrackingLineSearcher, LineSearchConfig, LineSearchOutcome, StepMultiplierSchedule,
};
pub use self::minimizer::LbfgsMinimizer;
pub use self::reference::{ReferenceOptions, ReferenceOutcome, reference_minimize};
pub use self::traits::{
    DifferentiableFunction, JointObjective, LbfgsOptions, MinimizeOutcome, Termination,
};
pub use self::types::{Cost, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_lbfgs::optimization::lbfgs::prelude::*;
//
// to import the main minimizer surface in a single line.

pub mod prelude {
    pub use super::cache::CachingDifferentiableFunction;
    pub use super::minimizer::LbfgsMinimizer;
    pub use super::traits::{
        DifferentiableFunction, JointObjective, LbfgsOptions, MinimizeOutcome, Termination,
    };
    pub use super::types::{Cost, Grad, Theta};
}
