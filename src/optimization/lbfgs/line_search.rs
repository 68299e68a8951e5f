//! lbfgs::line_search — backtracking line search with an Armijo test.
//!
//! Purpose
//! -------
//! Given an objective, a starting point `x`, and a descent direction `d`,
//! find a step `t > 0` with
//! `f(x + t·d) ≤ f(x) + c · t · ⟨∇f(x), d⟩ + eps`,
//! shrinking `t` geometrically while the test fails.
//!
//! Key behaviors
//! -------------
//! - Start every search from `initial_step_size` and multiply by
//!   `step_size_multiplier` after each rejected trial.
//! - Report step-size underflow (`t < eps` and `t · max|∇f(x)| < eps`) as
//!   [`LineSearchOutcome::Underflow`], leaving the decision to the caller.
//! - Stop after `max_iterations` shrinks when a cap is configured, reporting
//!   [`LineSearchOutcome::IterationLimit`].
//! - Let a caller vary the shrink factor per outer iteration through a
//!   [`StepMultiplierSchedule`] consulted by
//!   [`BacktrackingLineSearcher::configure_for_iteration`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Within one search the step size never increases.
//! - The underflow flag and step size are reset at the start of every
//!   search.
//! - Non-finite trial values simply fail the Armijo test, so the search
//!   backs out of regions where the objective blows up.
//!
//! Testing notes
//! -------------
//! - Unit tests pin the accepted step on `f(x) = x²` for immediate
//!   acceptance, repeated halving, per-iteration schedules, underflow on an
//!   objective whose gradient lies, and the trial cap.
use slog::{Logger, warn};

use crate::optimization::{
    errors::{OptError, OptResult},
    lbfgs::{
        traits::DifferentiableFunction,
        types::{
            Cost, DEFAULT_INITIAL_STEP_SIZE, DEFAULT_STEP_SIZE_MULTIPLIER,
            DEFAULT_SUFFICIENT_DECREASE, LINE_SEARCH_EPS, Theta,
        },
        validation::{
            validate_grad, validate_value, verify_line_search_eps, verify_step_multiplier,
            verify_step_size, verify_sufficient_decrease,
        },
    },
    logging::discard_logger,
    vector_ops::{comb, inner_prod, max_abs},
};

/// Shrink factor to use for a given outer-iteration index.
pub type StepMultiplierSchedule = Box<dyn Fn(usize) -> f64>;

/// Backtracking parameters.
///
/// - `initial_step_size` — first trial step (default 1.0).
/// - `step_size_multiplier` — shrink factor in `(0, 1)` (default 0.5).
/// - `sufficient_decrease_constant` — Armijo `c` in `(0, 1)` (default 1e-4).
/// - `eps` — acceptance slack and underflow threshold (default 1e-10).
/// - `max_iterations` — optional cap on shrinks; a search evaluates at most
///   `max_iterations + 1` trial points. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchConfig {
    pub initial_step_size: f64,
    pub step_size_multiplier: f64,
    pub sufficient_decrease_constant: f64,
    pub eps: f64,
    pub max_iterations: Option<usize>,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            initial_step_size: DEFAULT_INITIAL_STEP_SIZE,
            step_size_multiplier: DEFAULT_STEP_SIZE_MULTIPLIER,
            sufficient_decrease_constant: DEFAULT_SUFFICIENT_DECREASE,
            eps: LINE_SEARCH_EPS,
            max_iterations: None,
        }
    }
}

impl LineSearchConfig {
    /// Construct a validated configuration with the default `eps`.
    ///
    /// # Errors
    /// - [`OptError::InvalidStepSize`] for a non-positive or non-finite step.
    /// - [`OptError::InvalidStepMultiplier`] unless the multiplier is in `(0, 1)`.
    /// - [`OptError::InvalidSufficientDecrease`] unless `c` is in `(0, 1)`.
    pub fn new(
        initial_step_size: f64, step_size_multiplier: f64, sufficient_decrease_constant: f64,
        max_iterations: Option<usize>,
    ) -> OptResult<Self> {
        let config = Self {
            initial_step_size,
            step_size_multiplier,
            sufficient_decrease_constant,
            eps: LINE_SEARCH_EPS,
            max_iterations,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-run every field check; used when the config is built by struct literal.
    ///
    /// # Errors
    /// The first failing check among step size, multiplier, Armijo constant
    /// and `eps` ([`OptError::InvalidLineSearchEps`]).
    pub fn validate(&self) -> OptResult<()> {
        verify_step_size(self.initial_step_size)?;
        verify_step_multiplier(self.step_size_multiplier)?;
        verify_sufficient_decrease(self.sufficient_decrease_constant)?;
        verify_line_search_eps(self.eps)?;
        Ok(())
    }
}

/// Result of one line search.
#[derive(Debug, Clone, PartialEq)]
pub enum LineSearchOutcome {
    /// Armijo test passed at `step_size`; `value = f(point)`.
    Accepted { point: Theta, value: Cost, step_size: f64 },
    /// Step size underflowed before any trial passed.
    Underflow,
    /// Trial cap reached before any trial passed.
    IterationLimit,
}

/// Stateful backtracking line searcher.
pub struct BacktrackingLineSearcher {
    config: LineSearchConfig,
    step_size: f64,
    step_size_underflow: bool,
    schedule: Option<StepMultiplierSchedule>,
    logger: Logger,
}

impl Default for BacktrackingLineSearcher {
    fn default() -> Self {
        Self::unchecked(LineSearchConfig::default())
    }
}

impl BacktrackingLineSearcher {
    /// Build a searcher from a validated configuration.
    ///
    /// # Errors
    /// Whatever [`LineSearchConfig::validate`] reports.
    pub fn new(config: LineSearchConfig) -> OptResult<Self> {
        config.validate()?;
        Ok(Self::unchecked(config))
    }

    fn unchecked(config: LineSearchConfig) -> Self {
        Self {
            step_size: config.initial_step_size,
            config,
            step_size_underflow: false,
            schedule: None,
            logger: discard_logger(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Install a per-iteration shrink-factor schedule.
    pub fn with_schedule(mut self, schedule: StepMultiplierSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn config(&self) -> &LineSearchConfig {
        &self.config
    }

    pub fn set_max_iterations(&mut self, max_iterations: Option<usize>) {
        self.config.max_iterations = max_iterations;
    }

    /// Prepare for outer iteration `iteration`.
    ///
    /// Applies the schedule (if any) to the shrink factor and resets the
    /// step size to `initial_step_size`. Without a schedule only the reset
    /// happens.
    ///
    /// # Errors
    /// [`OptError::InvalidStepMultiplier`] if the schedule returns a value
    /// outside `(0, 1)`; the previous multiplier is kept.
    pub fn configure_for_iteration(&mut self, iteration: usize) -> OptResult<()> {
        if let Some(schedule) = &self.schedule {
            let multiplier = schedule(iteration);
            verify_step_multiplier(multiplier)?;
            self.config.step_size_multiplier = multiplier;
        }
        self.step_size = self.config.initial_step_size;
        Ok(())
    }

    /// Step size of the last accepted (or last rejected) trial.
    pub fn final_step_size(&self) -> f64 {
        self.step_size
    }

    pub fn step_size_underflowed(&self) -> bool {
        self.step_size_underflow
    }

    /// Search along `direction` from `initial`.
    ///
    /// # Errors
    /// - [`OptError::DimensionMismatch`] if `initial` or `direction` do not
    ///   have length `f.dimension()`.
    /// - Objective failures at the starting point, a non-finite starting
    ///   value, or a malformed starting gradient.
    /// - Objective failures at any trial point.
    pub fn minimize<F: DifferentiableFunction + ?Sized>(
        &mut self, f: &F, initial: &Theta, direction: &Theta,
    ) -> OptResult<LineSearchOutcome> {
        let dim = f.dimension();
        for len in [initial.len(), direction.len()] {
            if len != dim {
                return Err(OptError::DimensionMismatch { expected: dim, found: len });
            }
        }

        self.step_size_underflow = false;
        self.step_size = self.config.initial_step_size;

        let initial_value = f.value_at(initial)?;
        validate_value(initial_value)?;
        let derivative = f.derivative_at(initial)?;
        validate_grad(&derivative, dim)?;
        let slope = inner_prod(derivative.view(), direction.view());
        let deriv_max = max_abs(derivative.view());

        let mut shrinks = 0usize;
        loop {
            let guess = comb(initial.view(), 1.0, direction.view(), self.step_size);
            let guess_value = f.value_at(&guess)?;
            let threshold =
                initial_value + self.config.sufficient_decrease_constant * slope * self.step_size;
            if guess_value <= threshold + self.config.eps {
                return Ok(LineSearchOutcome::Accepted {
                    point: guess,
                    value: guess_value,
                    step_size: self.step_size,
                });
            }

            if self.step_size < self.config.eps && self.step_size * deriv_max < self.config.eps {
                warn!(self.logger, "line search step size underflow";
                    "step_size" => self.step_size,
                    "slope" => slope,
                    "deriv_max" => deriv_max,
                    "guess_value" => guess_value,
                    "threshold" => threshold,
                    "initial_value" => initial_value);
                self.step_size_underflow = true;
                return Ok(LineSearchOutcome::Underflow);
            }
            self.step_size *= self.config.step_size_multiplier;

            shrinks += 1;
            if self.config.max_iterations.is_some_and(|max| shrinks > max) {
                return Ok(LineSearchOutcome::IterationLimit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::lbfgs::types::Grad;
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Immediate acceptance and repeated halving on f(x) = x².
    // - Per-iteration multiplier schedules.
    // - Underflow and trial-cap outcomes on an objective whose gradient lies.
    // - Dimension checks.
    // - Rejection of unusable configurations and schedule outputs.
    //
    // They intentionally DO NOT cover:
    // - How the minimizer reacts to each outcome (see minimizer tests).
    // -------------------------------------------------------------------------

    /// f(x) = x².
    struct Square;

    impl DifferentiableFunction for Square {
        fn dimension(&self) -> usize {
            1
        }
        fn value_at(&self, x: &Theta) -> OptResult<Cost> {
            Ok(x[0] * x[0])
        }
        fn derivative_at(&self, x: &Theta) -> OptResult<Grad> {
            Ok(array![2.0 * x[0]])
        }
    }

    /// 0 at the origin, 1 everywhere else, with a gradient claiming slope 1.
    struct Spike {
        evaluations: Cell<usize>,
    }

    impl DifferentiableFunction for Spike {
        fn dimension(&self) -> usize {
            1
        }
        fn value_at(&self, x: &Theta) -> OptResult<Cost> {
            self.evaluations.set(self.evaluations.get() + 1);
            Ok(if x[0] == 0.0 { 0.0 } else { 1.0 })
        }
        fn derivative_at(&self, _x: &Theta) -> OptResult<Grad> {
            Ok(array![1.0])
        }
    }

    #[test]
    // Purpose
    // -------
    // The full step is accepted when it already satisfies Armijo.
    //
    // Given
    // -----
    // - f(x) = x², x = 1, d = -1, default configuration.
    //
    // Expect
    // ------
    // - Accepted at t = 1.0 with point [0] and value 0, since
    //   f(0) = 0 ≤ f(1) + c·(−2)·1.
    fn accepts_full_step_on_square() {
        // Arrange
        let mut searcher = BacktrackingLineSearcher::default();

        // Act
        let outcome = searcher.minimize(&Square, &array![1.0], &array![-1.0]).unwrap();

        // Assert
        assert_eq!(
            outcome,
            LineSearchOutcome::Accepted { point: array![0.0], value: 0.0, step_size: 1.0 }
        );
        assert!(!searcher.step_size_underflowed());
        assert_eq!(searcher.final_step_size(), 1.0);
    }

    #[test]
    // Purpose
    // -------
    // Rejected trials halve the step until Armijo holds, and the accepted
    // point never increases f.
    //
    // Given
    // -----
    // - f(x) = x², x = 1, d = -4.
    //
    // Expect
    // ------
    // - t = 1 (f = 9) and t = 0.5 (f = 1) are rejected; t = 0.25 lands on 0.
    fn halves_until_sufficient_decrease() {
        // Arrange
        let mut searcher = BacktrackingLineSearcher::default();

        // Act
        let outcome = searcher.minimize(&Square, &array![1.0], &array![-4.0]).unwrap();

        // Assert
        match outcome {
            LineSearchOutcome::Accepted { point, value, step_size } => {
                assert_eq!(step_size, 0.25);
                assert_relative_eq!(point[0], 0.0);
                assert!(value <= 1.0);
            }
            other => panic!("Expected Accepted, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // A schedule changes the shrink factor per outer iteration and
    // `configure_for_iteration` resets the step.
    //
    // Given
    // -----
    // - Schedule 0.01 on iteration 0, 0.5 afterwards; f(x) = x², x = 1, d = -4.
    //
    // Expect
    // ------
    // - Iteration 0 accepts t = 0.01; iteration 1 accepts t = 0.25.
    fn schedule_controls_multiplier_per_iteration() {
        // Arrange
        let mut searcher = BacktrackingLineSearcher::default()
            .with_schedule(Box::new(|it| if it == 0 { 0.01 } else { 0.5 }));

        // Act
        searcher.configure_for_iteration(0).unwrap();
        let first = searcher.minimize(&Square, &array![1.0], &array![-4.0]).unwrap();
        let first_multiplier = searcher.config().step_size_multiplier;
        searcher.configure_for_iteration(1).unwrap();
        let second = searcher.minimize(&Square, &array![1.0], &array![-4.0]).unwrap();

        // Assert
        assert_eq!(first_multiplier, 0.01);
        assert!(matches!(first, LineSearchOutcome::Accepted { step_size, .. } if step_size == 0.01));
        assert!(matches!(second, LineSearchOutcome::Accepted { step_size, .. } if step_size == 0.25));
        assert_eq!(searcher.config().step_size_multiplier, 0.5);
    }

    #[test]
    // Purpose
    // -------
    // When no step can pass, the search reports underflow instead of erroring.
    //
    // Given
    // -----
    // - The spike objective at 0 with direction -1.
    //
    // Expect
    // ------
    // - `Underflow`, the flag is set, and the last step is below 1e-10.
    fn reports_underflow_when_no_step_passes() {
        // Arrange
        let f = Spike { evaluations: Cell::new(0) };
        let mut searcher = BacktrackingLineSearcher::default();

        // Act
        let outcome = searcher.minimize(&f, &array![0.0], &array![-1.0]).unwrap();

        // Assert
        assert_eq!(outcome, LineSearchOutcome::Underflow);
        assert!(searcher.step_size_underflowed());
        assert!(searcher.final_step_size() < 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // A trial cap aborts without flagging underflow.
    //
    // Given
    // -----
    // - The spike objective and `max_iterations = Some(3)`.
    //
    // Expect
    // ------
    // - `IterationLimit` after 1 starting + 4 trial evaluations; no underflow.
    fn trial_cap_aborts_without_underflow() {
        // Arrange
        let f = Spike { evaluations: Cell::new(0) };
        let config = LineSearchConfig::new(1.0, 0.5, 1e-4, Some(3)).unwrap();
        let mut searcher = BacktrackingLineSearcher::new(config).unwrap();

        // Act
        let outcome = searcher.minimize(&f, &array![0.0], &array![-1.0]).unwrap();

        // Assert
        assert_eq!(outcome, LineSearchOutcome::IterationLimit);
        assert!(!searcher.step_size_underflowed());
        assert_eq!(f.evaluations.get(), 5);
    }

    #[test]
    // Purpose
    // -------
    // Reject directions whose length differs from the objective dimension.
    //
    // Given
    // -----
    // - f(x) = x² (dimension 1) and a length-2 direction.
    //
    // Expect
    // ------
    // - `DimensionMismatch { expected: 1, found: 2 }`.
    fn rejects_mismatched_direction() {
        let mut searcher = BacktrackingLineSearcher::default();
        let result = searcher.minimize(&Square, &array![1.0], &array![-1.0, 0.0]);
        assert_eq!(result, Err(OptError::DimensionMismatch { expected: 1, found: 2 }));
    }

    #[test]
    // Purpose
    // -------
    // A searcher cannot be built from a configuration that would return a
    // zero step or never terminate.
    //
    // Given
    // -----
    // - Struct-literal configs with multiplier 0 and 1, step size 0, Armijo
    //   constant 1 and eps 0.
    //
    // Expect
    // ------
    // - `new` rejects each with the matching error variant.
    fn new_rejects_invalid_config() {
        let base = LineSearchConfig::default();
        let cases = [
            LineSearchConfig { step_size_multiplier: 0.0, ..base },
            LineSearchConfig { step_size_multiplier: 1.0, ..base },
            LineSearchConfig { initial_step_size: 0.0, ..base },
            LineSearchConfig { sufficient_decrease_constant: 1.0, ..base },
            LineSearchConfig { eps: 0.0, ..base },
        ];

        let results: Vec<_> =
            cases.into_iter().map(|c| BacktrackingLineSearcher::new(c).err()).collect();

        assert!(matches!(results[0], Some(OptError::InvalidStepMultiplier { .. })));
        assert!(matches!(results[1], Some(OptError::InvalidStepMultiplier { .. })));
        assert!(matches!(results[2], Some(OptError::InvalidStepSize { .. })));
        assert!(matches!(results[3], Some(OptError::InvalidSufficientDecrease { .. })));
        assert!(matches!(results[4], Some(OptError::InvalidLineSearchEps { .. })));
        assert!(BacktrackingLineSearcher::new(base).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // A schedule returning an unusable shrink factor is rejected before any
    // search runs with it.
    //
    // Given
    // -----
    // - Schedule 0.0 on iteration 0 and 1.5 afterwards.
    //
    // Expect
    // ------
    // - Both iterations return `InvalidStepMultiplier`; the default
    //   multiplier 0.5 stays in place and a search still halves to t = 0.25.
    fn schedule_output_is_validated() {
        // Arrange
        let mut searcher = BacktrackingLineSearcher::default()
            .with_schedule(Box::new(|it| if it == 0 { 0.0 } else { 1.5 }));

        // Act
        let first = searcher.configure_for_iteration(0);
        let second = searcher.configure_for_iteration(1);
        let outcome = searcher.minimize(&Square, &array![1.0], &array![-4.0]).unwrap();

        // Assert
        assert!(matches!(first, Err(OptError::InvalidStepMultiplier { value, .. }) if value == 0.0));
        assert!(matches!(second, Err(OptError::InvalidStepMultiplier { value, .. }) if value == 1.5));
        assert_eq!(searcher.config().step_size_multiplier, 0.5);
        assert!(matches!(outcome, LineSearchOutcome::Accepted { step_size, .. } if step_size == 0.25));
    }
}
