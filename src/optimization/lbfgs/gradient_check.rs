//! lbfgs::gradient_check — compare analytic gradients with finite differences.
//!
//! Purpose
//! -------
//! Diagnose hand-written gradients. For every coordinate the checker shrinks
//! a forward-difference step until the empirical derivative agrees with the
//! analytic one, and reports the coordinates where no step size agrees.
//!
//! Key behaviors
//! -------------
//! - Per coordinate `i`, start from `δ = DEL_INITIAL` and divide by
//!   `DEL_DECAY` after each disagreement while `δ > DEL_MIN`.
//! - Agreement is decided by [`EmpiricalGradientTester::close`]: absolute
//!   difference below `EPS`, or relative difference below `REL_EPS`.
//! - Every disagreement is logged at warn level and returned in the
//!   [`GradientCheckReport`], together with a central-difference estimate of
//!   the full gradient computed with `finitediff`.
//! - The central estimate is best-effort: it evaluates `x − h`, which the
//!   forward pass never visits, so an objective failure there only drops the
//!   estimate (logged at warn level) instead of failing the check.
//!
//! Invariants & assumptions
//! ------------------------
//! - The checker never changes the point it was given; perturbed copies are
//!   restored coordinate by coordinate.
//! - Mismatches are diagnostics, not errors. Only objective failures at `x`
//!   or at a forward-difference point, and malformed analytic gradients,
//!   produce `Err`.
//!
//! Downstream usage
//! ----------------
//! - `LbfgsMinimizer` runs the checker at every iterate when
//!   `check_empirical_gradient` is set.
use std::cell::RefCell;

use finitediff::FiniteDiff;
use slog::{Logger, warn};

use crate::optimization::{
    errors::{OptError, OptResult},
    lbfgs::{
        traits::DifferentiableFunction,
        types::{Grad, Theta},
        validation::{validate_grad, validate_theta, validate_value},
    },
    logging::discard_logger,
};

/// Absolute agreement threshold.
pub const EPS: f64 = 1e-6;
/// Relative agreement threshold.
pub const REL_EPS: f64 = 1e-3;
/// First forward-difference step.
pub const DEL_INITIAL: f64 = 1e-5;
/// Smallest forward-difference step tried.
pub const DEL_MIN: f64 = 1e-10;
/// Step divisor after a disagreement.
pub const DEL_DECAY: f64 = 1.1;

/// One coordinate whose analytic derivative matched no forward difference.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMismatch {
    pub index: usize,
    /// Last step size tried.
    pub delta: f64,
    pub analytic: f64,
    /// Forward difference at `delta`.
    pub empirical: f64,
    /// Central-difference estimate, if it could be computed.
    pub central: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientCheckReport {
    pub analytic: Grad,
    /// `None` when the objective failed at a central-difference point.
    pub central: Option<Grad>,
    pub mismatches: Vec<GradientMismatch>,
}

impl GradientCheckReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EmpiricalGradientTester {
    logger: Logger,
}

impl Default for EmpiricalGradientTester {
    fn default() -> Self {
        Self::new()
    }
}

impl EmpiricalGradientTester {
    pub fn new() -> Self {
        Self { logger: discard_logger() }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Whether two derivative estimates agree.
    ///
    /// True when `|x − y| < EPS`; otherwise when
    /// `|x − y| / ((|x| + |y|) / 2) < REL_EPS`.
    pub fn close(x: f64, y: f64) -> bool {
        let diff = (x - y).abs();
        if diff < EPS {
            return true;
        }
        let avg_mag = (x.abs() + y.abs()) / 2.0;
        diff / avg_mag < REL_EPS
    }

    /// Check the analytic gradient of `f` at `x` coordinate by coordinate.
    ///
    /// Parameters
    /// ----------
    /// - `f`: objective under test.
    /// - `x`: point of length `f.dimension()`; left untouched.
    ///
    /// Returns
    /// -------
    /// A [`GradientCheckReport`] listing every coordinate without agreement.
    ///
    /// Errors
    /// ------
    /// - Shape/finiteness errors for `x`, the base value or the analytic
    ///   gradient.
    /// - Any error the objective raises at `x` or at a forward-difference
    ///   point. Failures during the central-difference pass are logged and
    ///   leave `central` empty.
    pub fn test<F: DifferentiableFunction + ?Sized>(
        &self, f: &F, x: &Theta,
    ) -> OptResult<GradientCheckReport> {
        let dim = f.dimension();
        validate_theta(x, dim)?;
        let base_value = f.value_at(x)?;
        validate_value(base_value)?;
        let analytic = f.derivative_at(x)?;
        validate_grad(&analytic, dim)?;
        let central = self.central_estimate(f, x);

        let mut perturbed = x.clone();
        let mut mismatches = Vec::new();
        for i in 0..dim {
            let mut delta = DEL_INITIAL;
            let mut matched = false;
            let mut empirical = 0.0;
            while delta > DEL_MIN && !matched {
                perturbed[i] = x[i] + delta;
                let next_value = f.value_at(&perturbed)?;
                perturbed[i] = x[i];
                empirical = (next_value - base_value) / delta;
                if Self::close(empirical, analytic[i]) {
                    matched = true;
                } else {
                    delta /= DEL_DECAY;
                }
            }
            if !matched {
                warn!(self.logger, "empirical gradient step-size underflow";
                    "index" => i,
                    "delta" => delta,
                    "analytic" => analytic[i],
                    "empirical" => empirical,
                    "central" => central.as_ref().map(|c| c[i]));
                mismatches.push(GradientMismatch {
                    index: i,
                    delta,
                    analytic: analytic[i],
                    empirical,
                    central: central.as_ref().map(|c| c[i]),
                });
            }
        }
        Ok(GradientCheckReport { analytic, central, mismatches })
    }

    /// Central-difference gradient of `f` at `x`, or `None` if the objective
    /// failed at one of the evaluation points.
    ///
    /// The `finitediff` closure must return a bare `f64`, so the first
    /// objective error is parked in a cell and inspected after the pass.
    fn central_estimate<F: DifferentiableFunction + ?Sized>(
        &self, f: &F, x: &Theta,
    ) -> Option<Grad> {
        let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
        let value_fn = |p: &Theta| -> f64 {
            match f.value_at(p) {
                Ok(v) => v,
                Err(e) => {
                    let mut slot = closure_err.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                    f64::NAN
                }
            }
        };
        let estimate = x.central_diff(&value_fn);
        match closure_err.take() {
            Some(err) => {
                warn!(self.logger, "central-difference estimate unavailable";
                    "error" => err.to_string());
                None
            }
            None => Some(estimate),
        }
    }
}
