//! lbfgs::minimizer — the L-BFGS outer loop.
//!
//! Purpose
//! -------
//! Minimize a [`DifferentiableFunction`] from a starting point using
//! limited-memory BFGS directions and the backtracking line search, with
//! history resets as the recovery path for numerical trouble.
//!
//! Key behaviors
//! -------------
//! - Each outer iteration computes `d = −H·g` from the curvature history
//!   (two-loop recursion with `γ` scaling), backtracks along `d`, and stores
//!   the new curvature pair.
//! - Step-size underflow clears the history and retries the same iteration
//!   while resets remain (bounded by `max_history_resets`); afterwards the
//!   run ends with [`Termination::StepSizeUnderflow`] or, when configured,
//!   with [`OptError::StepSizeUnderflow`].
//! - Convergence on the relative change of the objective must be seen twice
//!   in a row: the first hit clears the history (through the same counted
//!   reset path) and the second one returns. `finish_on_first_converge`
//!   returns on the first hit.
//! - Running out of iterations returns the last point with
//!   [`Termination::Exhausted`]; it is not an error.
//!
//! Invariants & assumptions
//! ------------------------
//! - The caller's starting point is never mutated.
//! - The reset counter is reset at the start of every `minimize*` call.
//!   History and the convergence latch are reset too unless
//!   `clear_history_on_minimize` is off, in which case both carry over and
//!   the previous call's curvature pairs warm-start the next one.
//! - A step that leaves the point unchanged adds no curvature pair.
//! - Zero curvature `⟨s, y⟩ == 0` in a stored pair aborts the run with
//!   [`OptError::CurvatureFailure`].
//!
//! Conventions
//! -----------
//! - Iterations are numbered from 0. Iteration 0 backtracks with
//!   `initial_step_size_multiplier`, later ones with `step_size_multiplier`.
//! - Convergence checks are skipped while `iteration < min_iterations`.
//!
//! Testing notes
//! -------------
//! - Unit tests use one-dimensional objectives whose iterates can be traced
//!   by hand, plus a 2-D quadratic with a known minimizer. Integration tests
//!   compare against argmin's L-BFGS on Rosenbrock.
use slog::{Logger, info};

use crate::optimization::{
    errors::{OptError, OptResult},
    lbfgs::{
        gradient_check::EmpiricalGradientTester,
        history::CurvatureHistory,
        line_search::{BacktrackingLineSearcher, LineSearchConfig, LineSearchOutcome},
        traits::{DifferentiableFunction, LbfgsOptions, MinimizeOutcome, Termination},
        types::{CONVERGENCE_EPS, Cost, Grad, Theta},
        validation::{validate_grad, validate_theta, validate_value, verify_tolerance},
    },
    logging::discard_logger,
    vector_ops::comb,
};

/// Limited-memory BFGS minimizer.
///
/// Configure through the setters (or [`LbfgsMinimizer::with_options`]) and
/// drive it with [`minimize`](Self::minimize) and friends. One instance may
/// serve many calls.
pub struct LbfgsMinimizer {
    options: LbfgsOptions,
    history: CurvatureHistory,
    num_history_resets: usize,
    converged_and_cleared_histories: bool,
    logger: Logger,
}

impl Default for LbfgsMinimizer {
    fn default() -> Self {
        let options = LbfgsOptions::default();
        Self {
            history: CurvatureHistory::new(options.max_history_size),
            options,
            num_history_resets: 0,
            converged_and_cleared_histories: false,
            logger: discard_logger(),
        }
    }
}

impl LbfgsMinimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a minimizer from explicit options.
    ///
    /// # Errors
    /// Whatever [`LbfgsOptions::validate`] reports.
    pub fn with_options(options: LbfgsOptions) -> OptResult<Self> {
        options.validate()?;
        let history = CurvatureHistory::new(options.max_history_size);
        Ok(Self { history, options, ..Self::default() })
    }

    pub fn options(&self) -> &LbfgsOptions {
        &self.options
    }

    pub fn history(&self) -> &CurvatureHistory {
        &self.history
    }

    /// History clears performed during the current or last call.
    pub fn history_resets(&self) -> usize {
        self.num_history_resets
    }

    // ---- Configuration ----

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> OptResult<()> {
        self.options.set_max_iterations(max_iterations)
    }

    /// Change the history bound; existing pairs beyond it are dropped oldest-first.
    pub fn set_max_history_size(&mut self, max_history_size: usize) -> OptResult<()> {
        self.options.set_max_history_size(max_history_size)?;
        self.history.set_capacity(max_history_size);
        Ok(())
    }

    pub fn set_min_iterations(&mut self, min_iterations: usize) {
        self.options.min_iterations = min_iterations;
    }

    pub fn set_initial_step_size_multiplier(&mut self, multiplier: f64) -> OptResult<()> {
        self.options.set_initial_step_size_multiplier(multiplier)
    }

    pub fn set_step_size_multiplier(&mut self, multiplier: f64) -> OptResult<()> {
        self.options.set_step_size_multiplier(multiplier)
    }

    pub fn set_finish_on_first_converge(&mut self, finish: bool) {
        self.options.finish_on_first_converge = finish;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.options.verbose = verbose;
    }

    pub fn set_check_empirical_gradient(&mut self, check: bool) {
        self.options.check_empirical_gradient = check;
    }

    pub fn set_throw_exception_on_step_size_underflow(&mut self, throw: bool) {
        self.options.throw_exception_on_step_size_underflow = throw;
    }

    pub fn set_max_history_resets(&mut self, max_history_resets: usize) {
        self.options.max_history_resets = max_history_resets;
    }

    pub fn set_clear_history_on_minimize(&mut self, clear: bool) {
        self.options.clear_history_on_minimize = clear;
    }

    pub fn set_line_search_max_iterations(&mut self, max_iterations: Option<usize>) {
        self.options.line_search_max_iterations = max_iterations;
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    // ---- Entry points ----

    /// Minimize `f` from `initial` and return the final point.
    ///
    /// # Errors
    /// See [`minimize_detailed`](Self::minimize_detailed).
    pub fn minimize<F: DifferentiableFunction + ?Sized>(
        &mut self, f: &F, initial: &Theta, tolerance: f64,
    ) -> OptResult<Theta> {
        self.minimize_detailed(f, initial, tolerance, false).map(|out| out.theta_hat)
    }

    /// As [`minimize`](Self::minimize), logging `(iteration, value)` after
    /// every accepted step when `print_progress` is set.
    pub fn minimize_with_progress<F: DifferentiableFunction + ?Sized>(
        &mut self, f: &F, initial: &Theta, tolerance: f64, print_progress: bool,
    ) -> OptResult<Theta> {
        self.minimize_detailed(f, initial, tolerance, print_progress).map(|out| out.theta_hat)
    }

    /// Run L-BFGS and report how the run ended.
    ///
    /// Parameters
    /// ----------
    /// - `f`: objective.
    /// - `initial`: starting point of length `f.dimension()`; copied.
    /// - `tolerance`: relative objective change treated as converged (≥ 0).
    /// - `print_progress`: log every accepted iterate at info level.
    ///
    /// Returns
    /// -------
    /// [`MinimizeOutcome`] with the final point, its value and gradient norm,
    /// the [`Termination`] state, the number of outer iterations started
    /// and the history resets spent.
    ///
    /// Errors
    /// ------
    /// - [`OptError::InvalidTolerance`] for a negative or non-finite tolerance.
    /// - Shape/finiteness errors for `initial`, values and gradients.
    /// - [`OptError::CurvatureFailure`] on a zero-curvature history pair.
    /// - [`OptError::StepSizeUnderflow`] when underflow persists after all
    ///   resets and `throw_exception_on_step_size_underflow` is set.
    /// - Any error raised by the objective.
    pub fn minimize_detailed<F: DifferentiableFunction + ?Sized>(
        &mut self, f: &F, initial: &Theta, tolerance: f64, print_progress: bool,
    ) -> OptResult<MinimizeOutcome> {
        verify_tolerance(tolerance)?;
        let dim = f.dimension();
        validate_theta(initial, dim)?;

        self.num_history_resets = 0;
        if self.options.clear_history_on_minimize {
            self.history.clear();
            self.converged_and_cleared_histories = false;
        }

        let mut line_searcher = self.line_searcher()?;
        let mut guess = initial.clone();
        let mut value = f.value_at(&guess)?;
        validate_value(value)?;
        let mut derivative = f.derivative_at(&guess)?;
        validate_grad(&derivative, dim)?;

        let mut iteration = 0;
        let mut termination = Termination::Exhausted;
        while iteration < self.options.max_iterations {
            if self.options.check_empirical_gradient {
                EmpiricalGradientTester::new().with_logger(self.logger.clone()).test(f, &guess)?;
            }

            let direction = self.search_direction(&derivative)?.mapv_into(|v| -v);
            line_searcher.configure_for_iteration(iteration)?;
            let (next_guess, next_value) =
                match line_searcher.minimize(f, &guess, &direction)? {
                    LineSearchOutcome::Accepted { point, value: next_value, .. } => {
                        (point, next_value)
                    }
                    LineSearchOutcome::IterationLimit => (guess.clone(), value),
                    LineSearchOutcome::Underflow => {
                        // Retrying from an empty history would repeat the same search.
                        if !self.history.is_empty() && self.clear_histories() {
                            continue;
                        }
                        if self.options.throw_exception_on_step_size_underflow {
                            return Err(OptError::StepSizeUnderflow {
                                theta: guess,
                                grad: derivative,
                            });
                        }
                        termination = Termination::StepSizeUnderflow;
                        iteration += 1;
                        break;
                    }
                };
            validate_value(next_value)?;
            let next_derivative = f.derivative_at(&next_guess)?;
            validate_grad(&next_derivative, dim)?;

            if print_progress {
                info!(self.logger, "iteration ended"; "iteration" => iteration, "value" => next_value);
            }

            if iteration >= self.options.min_iterations && converged(value, next_value, tolerance) {
                if !self.options.finish_on_first_converge && !self.converged_and_cleared_histories {
                    self.clear_histories();
                    self.converged_and_cleared_histories = true;
                } else {
                    guess = next_guess;
                    value = next_value;
                    derivative = next_derivative;
                    termination = Termination::Converged;
                    iteration += 1;
                    break;
                }
            } else {
                self.converged_and_cleared_histories = false;
            }

            let s = comb(next_guess.view(), 1.0, guess.view(), -1.0);
            if s.iter().any(|&v| v != 0.0) {
                let y = comb(next_derivative.view(), 1.0, derivative.view(), -1.0);
                self.history.push(s, y);
            }
            guess = next_guess;
            value = next_value;
            derivative = next_derivative;
            iteration += 1;
        }

        if termination == Termination::Exhausted && self.options.verbose {
            info!(self.logger, "exceeded max iterations without converging";
                "max_iterations" => self.options.max_iterations);
        }
        let resets = self.num_history_resets;
        MinimizeOutcome::new(guess, value, &derivative, termination, iteration, resets)
    }

    /// Inverse-Hessian approximation applied to `grad` (`H·g`, not negated).
    ///
    /// # Errors
    /// - [`OptError::GradientDimMismatch`] if `grad` does not match the
    ///   length of the stored pairs.
    /// - [`OptError::CurvatureFailure`] on a zero-curvature pair.
    pub fn search_direction(&self, grad: &Grad) -> OptResult<Grad> {
        if let Some(newest) = self.history.get(0) {
            if newest.s.len() != grad.len() {
                return Err(OptError::GradientDimMismatch {
                    expected: newest.s.len(),
                    found: grad.len(),
                });
            }
        }
        self.history.implicit_multiply(self.history.initial_scale(), grad)
    }

    /// Drop all curvature pairs if resets remain.
    ///
    /// Returns `true` and counts the reset when `history_resets() <
    /// max_history_resets`; otherwise leaves the history alone and returns
    /// `false`.
    pub fn clear_histories(&mut self) -> bool {
        if self.num_history_resets >= self.options.max_history_resets {
            return false;
        }
        if self.options.verbose {
            info!(self.logger, "cleared history"; "resets" => self.num_history_resets + 1);
        }
        self.history.clear();
        self.num_history_resets += 1;
        true
    }

    fn line_searcher(&self) -> OptResult<BacktrackingLineSearcher> {
        let config = LineSearchConfig {
            max_iterations: self.options.line_search_max_iterations,
            ..LineSearchConfig::default()
        };
        let options = self.options.clone();
        Ok(BacktrackingLineSearcher::new(config)?
            .with_schedule(Box::new(move |it| options.multiplier_for_iteration(it)))
            .with_logger(self.logger.clone()))
    }
}

/// Relative-change convergence test.
fn converged(value: Cost, next_value: Cost, tolerance: f64) -> bool {
    if value == next_value {
        return true;
    }
    let change = (next_value - value).abs();
    let average = (next_value + value).abs() / 2.0 + CONVERGENCE_EPS;
    change / average < tolerance
}
