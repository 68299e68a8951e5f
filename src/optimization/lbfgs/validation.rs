//! Validation helpers for the L-BFGS stack.
//!
//! This module centralizes common consistency checks used across the
//! optimizer interface:
//!
//! - **Configuration checks**: [`verify_max_iter`], [`verify_history_size`],
//!   [`verify_step_multiplier`], [`verify_step_size`],
//!   [`verify_sufficient_decrease`], [`verify_tolerance`].
//! - **Point validation**: [`validate_theta`] enforces the objective's
//!   dimension and finite entries.
//! - **Gradient validation**: [`validate_grad`] enforces correct dimension
//!   and finite entries.
//! - **Objective values**: [`validate_value`] checks objective outputs for
//!   finiteness.
//!
//! These helpers standardize error reporting by returning domain-specific
//! [`OptError`] variants, making higher-level code more uniform and easier
//! to debug.
use crate::optimization::{
    errors::{OptError, OptResult},
    lbfgs::types::{Grad, Theta},
};

/// Validate an iteration budget.
///
/// # Errors
/// Returns [`OptError::InvalidMaxIter`] if `max_iter == 0`.
pub fn verify_max_iter(max_iter: usize) -> OptResult<()> {
    if max_iter == 0 {
        return Err(OptError::InvalidMaxIter {
            max_iter,
            reason: "Maximum iterations must be greater than zero.",
        });
    }
    Ok(())
}

/// Validate the number of retained curvature pairs.
///
/// # Errors
/// Returns [`OptError::InvalidHistorySize`] if `size == 0`.
pub fn verify_history_size(size: usize) -> OptResult<()> {
    if size == 0 {
        return Err(OptError::InvalidHistorySize {
            size,
            reason: "L-BFGS history size must be greater than zero.",
        });
    }
    Ok(())
}

/// Validate a step-size shrink factor.
///
/// The multiplier must be **finite** and lie strictly inside `(0, 1)`,
/// otherwise backtracking would never shrink (≥ 1) or collapse to zero.
///
/// # Errors
/// Returns [`OptError::InvalidStepMultiplier`] on violation.
pub fn verify_step_multiplier(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::InvalidStepMultiplier { value, reason: "Multiplier must be finite." });
    }
    if value <= 0.0 || value >= 1.0 {
        return Err(OptError::InvalidStepMultiplier {
            value,
            reason: "Multiplier must lie strictly between 0 and 1.",
        });
    }
    Ok(())
}

/// Validate the initial trial step of the line search.
///
/// # Errors
/// Returns [`OptError::InvalidStepSize`] if the value is non-finite or ≤ 0.0.
pub fn verify_step_size(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::InvalidStepSize { value, reason: "Step size must be finite." });
    }
    if value <= 0.0 {
        return Err(OptError::InvalidStepSize { value, reason: "Step size must be positive." });
    }
    Ok(())
}

/// Validate the Armijo constant `c`.
///
/// # Errors
/// Returns [`OptError::InvalidSufficientDecrease`] unless `0 < c < 1`.
pub fn verify_sufficient_decrease(value: f64) -> OptResult<()> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(OptError::InvalidSufficientDecrease {
            value,
            reason: "Constant must lie strictly between 0 and 1.",
        });
    }
    Ok(())
}

/// Validate the line-search slack `eps`, which is also the underflow
/// threshold; with `eps ≤ 0` underflow could never be detected.
///
/// # Errors
/// Returns [`OptError::InvalidLineSearchEps`] unless the value is finite and > 0.0.
pub fn verify_line_search_eps(value: f64) -> OptResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OptError::InvalidLineSearchEps {
            value,
            reason: "Eps must be positive and finite.",
        });
    }
    Ok(())
}

/// Validate the relative-change convergence tolerance.
///
/// Zero is accepted: the minimizer then only stops on an exact repeat of
/// the objective value or on its iteration budget.
///
/// # Errors
/// Returns [`OptError::InvalidTolerance`] if the value is non-finite or < 0.0.
pub fn verify_tolerance(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidTolerance { tol, reason: "Tolerance must be finite." });
    }
    if tol < 0.0 {
        return Err(OptError::InvalidTolerance { tol, reason: "Tolerance must be non-negative." });
    }
    Ok(())
}

/// Validate a point against the objective dimension and finiteness.
///
/// # Errors
/// - [`OptError::DimensionMismatch`] if `theta.len() != dim`.
/// - [`OptError::InvalidThetaInput`] for the first non-finite element.
pub fn validate_theta(theta: &Theta, dim: usize) -> OptResult<()> {
    if theta.len() != dim {
        return Err(OptError::DimensionMismatch { expected: dim, found: theta.len() });
    }
    for (index, &value) in theta.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaInput { index, value });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// Checks:
/// - `grad.len() == dim`
/// - every element is finite (`NaN` or `±∞` are rejected)
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value/reason of the first
///   offending element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate that a scalar objective value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Accept/reject boundaries of each configuration check.
    // - Shape and finiteness checks for points and gradients.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify the open-interval checks for multipliers and the Armijo constant.
    //
    // Given
    // -----
    // - Boundary values 0, 1, NaN and an interior value.
    //
    // Expect
    // ------
    // - Only the interior value is accepted.
    fn open_interval_checks_reject_boundaries() {
        assert!(verify_step_multiplier(0.5).is_ok());
        assert!(verify_step_multiplier(0.0).is_err());
        assert!(verify_step_multiplier(1.0).is_err());
        assert!(verify_step_multiplier(f64::NAN).is_err());

        assert!(verify_sufficient_decrease(1e-4).is_ok());
        assert!(verify_sufficient_decrease(0.0).is_err());
        assert!(verify_sufficient_decrease(1.0).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Check counts, step sizes and tolerances.
    //
    // Given
    // -----
    // - Zero counts, negative and infinite step sizes/tolerances, a zero
    //   line-search eps, and a zero tolerance.
    //
    // Expect
    // ------
    // - Zero counts, a zero eps and negative/infinite values are rejected;
    //   a zero tolerance is accepted.
    fn counts_steps_and_tolerances() {
        assert!(matches!(verify_max_iter(0), Err(OptError::InvalidMaxIter { .. })));
        assert!(verify_max_iter(1).is_ok());
        assert!(matches!(verify_history_size(0), Err(OptError::InvalidHistorySize { .. })));
        assert!(verify_history_size(5).is_ok());

        assert!(verify_step_size(1.0).is_ok());
        assert!(verify_step_size(-1.0).is_err());
        assert!(verify_step_size(f64::INFINITY).is_err());

        assert!(verify_line_search_eps(1e-10).is_ok());
        assert!(matches!(verify_line_search_eps(0.0), Err(OptError::InvalidLineSearchEps { .. })));
        assert!(verify_line_search_eps(f64::NAN).is_err());

        assert!(verify_tolerance(0.0).is_ok());
        assert!(verify_tolerance(1e-8).is_ok());
        assert!(matches!(verify_tolerance(-1e-8), Err(OptError::InvalidTolerance { .. })));
        assert!(verify_tolerance(f64::NAN).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Confirm that points and gradients are checked for length first, then
    // for finiteness, reporting the first offending index.
    //
    // Given
    // -----
    // - A length-2 point checked against dimension 3.
    // - A gradient with an infinite second entry.
    //
    // Expect
    // ------
    // - DimensionMismatch, then InvalidGradient at index 1.
    fn shape_then_finiteness() {
        // Arrange
        let theta = array![1.0, 2.0];
        let grad = array![0.0, f64::INFINITY, f64::NAN];

        // Act
        let theta_err = validate_theta(&theta, 3).unwrap_err();
        let grad_err = validate_grad(&grad, 3).unwrap_err();

        // Assert
        assert_eq!(theta_err, OptError::DimensionMismatch { expected: 3, found: 2 });
        match grad_err {
            OptError::InvalidGradient { index, .. } => assert_eq!(index, 1),
            other => panic!("Expected InvalidGradient, got {other:?}"),
        }
        assert!(validate_value(f64::NAN).is_err());
        assert!(validate_value(-3.0).is_ok());
        assert!(matches!(
            validate_theta(&array![f64::NAN], 1),
            Err(OptError::InvalidThetaInput { index: 0, .. })
        ));
    }
}
