//! optimization::errors — unified error surface for the L-BFGS stack.
//!
//! Purpose
//! -------
//! Provide a single error enum and result alias shared by the objective
//! contract, the caching decorator, the line searcher, the minimizer, and
//! the argmin interop layer. Every failure that can leave the optimization
//! layer is expressed as an [`OptError`] variant carrying the offending
//! values.
//!
//! Key behaviors
//! -------------
//! - Distinguish configuration mistakes (invalid iteration counts, history
//!   sizes, multipliers, tolerances) from numerical failures (curvature
//!   breakdown, hard step-size underflow) and from objective failures.
//! - Attach human-readable `Display` messages so logs and Python exceptions
//!   are meaningful without additional context.
//! - Convert argmin runtime errors into [`OptError`] via `From`, so the
//!   reference solver never leaks backend error types.
//! - Map [`OptError`] into `PyValueError` at the PyO3 boundary when the
//!   `python-bindings` feature is enabled.
//!
//! Invariants & assumptions
//! ------------------------
//! - Iteration budget exhaustion and empirical-gradient mismatches are NOT
//!   errors; they are reported through outcomes and logs.
//! - `StepSizeUnderflow` is only produced when the minimizer is explicitly
//!   configured to fail on persistent underflow; it carries the last point
//!   and gradient for diagnostics.
//!
//! Testing notes
//! -------------
//! - Unit tests check that `Display` messages embed their payloads and that
//!   argmin errors keep their kind when mapped to `Backend`.
use argmin::core::{ArgminError, Error};

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

use crate::optimization::lbfgs::types::{Grad, Theta};

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Numerical failures ----
    /// Zero inner product `⟨s_i, y_i⟩` in the two-loop recursion.
    CurvatureFailure {
        index: usize,
    },

    /// Persistent step-size underflow with hard failure enabled.
    StepSizeUnderflow {
        theta: Theta,
        grad: Grad,
    },

    // ---- Shapes and values ----
    /// Point or direction length does not match the objective dimension.
    DimensionMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite.
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Objective returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    /// Initial point elements need to be finite.
    InvalidThetaInput {
        index: usize,
        value: f64,
    },

    // ---- Configuration ----
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },

    /// History size needs to be at least 1.
    InvalidHistorySize {
        size: usize,
        reason: &'static str,
    },

    /// Step multipliers need to lie in (0, 1).
    InvalidStepMultiplier {
        value: f64,
        reason: &'static str,
    },

    /// Initial step size needs to be positive and finite.
    InvalidStepSize {
        value: f64,
        reason: &'static str,
    },

    /// Armijo constant needs to lie in (0, 1).
    InvalidSufficientDecrease {
        value: f64,
        reason: &'static str,
    },

    /// Line-search slack needs to be positive and finite.
    InvalidLineSearchEps {
        value: f64,
        reason: &'static str,
    },

    /// Convergence tolerance needs to be finite and non-negative.
    InvalidTolerance {
        tol: f64,
        reason: &'static str,
    },

    // ---- Objective ----
    /// Failure raised by a user objective (e.g. a Python callable).
    ObjectiveError {
        text: String,
    },

    // ---- Argmin ----
    /// Error raised inside the argmin executor; `kind` names the
    /// `ArgminError` variant, or is `"other"` for untyped errors.
    Backend {
        kind: &'static str,
        text: String,
    },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Numerical failures ----
            OptError::CurvatureFailure { index } => {
                write!(f, "Curvature problem: zero <s, y> for history pair {index}")
            }
            OptError::StepSizeUnderflow { theta, grad } => {
                write!(f, "Step size underflow at theta = {theta}, gradient = {grad}")
            }

            // ---- Shapes and values ----
            OptError::DimensionMismatch { expected, found } => {
                write!(f, "Dimension mismatch: expected {expected}, found {found}")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite objective value: {value}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }

            // ---- Configuration ----
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::InvalidHistorySize { size, reason } => {
                write!(f, "Invalid L-BFGS history size {size}: {reason}")
            }
            OptError::InvalidStepMultiplier { value, reason } => {
                write!(f, "Invalid step size multiplier {value}: {reason}")
            }
            OptError::InvalidStepSize { value, reason } => {
                write!(f, "Invalid initial step size {value}: {reason}")
            }
            OptError::InvalidSufficientDecrease { value, reason } => {
                write!(f, "Invalid sufficient decrease constant {value}: {reason}")
            }
            OptError::InvalidLineSearchEps { value, reason } => {
                write!(f, "Invalid line-search eps {value}: {reason}")
            }
            OptError::InvalidTolerance { tol, reason } => {
                write!(f, "Invalid convergence tolerance {tol}: {reason}")
            }

            // ---- Objective ----
            OptError::ObjectiveError { text } => {
                write!(f, "Objective evaluation failed: {text}")
            }

            // ---- Argmin ----
            OptError::Backend { kind, text } => {
                write!(f, "argmin error ({kind}): {text}")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(err: Error) -> Self {
        // Errors raised by our own adapter travel through argmin boxed.
        let err = match err.downcast::<OptError>() {
            Ok(own) => return own,
            Err(err) => err,
        };
        let (kind, text) = match err.downcast::<ArgminError>() {
            Ok(ArgminError::InvalidParameter { text }) => ("invalid parameter", text),
            Ok(ArgminError::NotImplemented { text }) => ("not implemented", text),
            Ok(ArgminError::NotInitialized { text }) => ("not initialized", text),
            Ok(ArgminError::ConditionViolated { text }) => ("condition violated", text),
            Ok(ArgminError::CheckpointNotFound { text }) => ("checkpoint not found", text),
            Ok(ArgminError::PotentialBug { text }) => ("potential bug", text),
            Ok(ArgminError::ImpossibleError { text }) => ("impossible", text),
            Ok(other) => ("other", other.to_string()),
            Err(err) => ("other", err.to_string()),
        };
        OptError::Backend { kind, text }
    }
}

#[cfg(feature = "python-bindings")]
impl From<OptError> for PyErr {
    fn from(err: OptError) -> PyErr {
        PyValueError::new_err(format!("OptError: {err}"))
    }
}
