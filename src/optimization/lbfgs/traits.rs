//! Public API surface for L-BFGS minimization.
//!
//! - [`DifferentiableFunction`]: the objective contract the minimizer drives.
//! - [`JointObjective`]: objectives that compute value and gradient together;
//!   wrap them in [`CachingDifferentiableFunction`](super::cache::CachingDifferentiableFunction).
//! - [`LbfgsOptions`]: per-instance configuration for the minimizer.
//! - [`Termination`] and [`MinimizeOutcome`]: normalized result of a run.
//!
//! Convention: objectives are always *minimized*. Points and gradients are
//! [`Theta`] / [`Grad`] with length `dimension()`.
use crate::optimization::{
    errors::OptResult,
    lbfgs::{
        types::{
            Cost, DEFAULT_HISTORY_SIZE, DEFAULT_INITIAL_STEP_SIZE_MULTIPLIER,
            DEFAULT_MAX_ITERATIONS, DEFAULT_STEP_SIZE_MULTIPLIER, Grad, Theta,
        },
        validation::{
            validate_theta, validate_value, verify_history_size, verify_max_iter,
            verify_step_multiplier,
        },
    },
    vector_ops::l2_norm,
};

/// Differentiable objective `f: ℝⁿ → ℝ`.
///
/// Required:
/// - `dimension()`: fixed, positive length `n` of every point.
/// - `value_at(x)`: `f(x)`; must not have side effects visible to the caller.
/// - `derivative_at(x)`: `∇f(x)`, a vector of length `n`.
///
/// The same point must always produce the same value and gradient; the
/// caching decorator relies on exact reproducibility. Out-of-domain points
/// may be rejected with an [`OptError`](crate::optimization::errors::OptError),
/// which ends the current `minimize` call.
pub trait DifferentiableFunction {
    fn dimension(&self) -> usize;
    fn value_at(&self, x: &Theta) -> OptResult<Cost>;
    fn derivative_at(&self, x: &Theta) -> OptResult<Grad>;
}

impl<F: DifferentiableFunction + ?Sized> DifferentiableFunction for &F {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn value_at(&self, x: &Theta) -> OptResult<Cost> {
        (**self).value_at(x)
    }

    fn derivative_at(&self, x: &Theta) -> OptResult<Grad> {
        (**self).derivative_at(x)
    }
}

/// Objective whose value and gradient come out of one computation.
///
/// Typical for likelihoods over a dataset, where both quantities share one
/// pass over the data. Pair with the caching decorator to expose it as a
/// [`DifferentiableFunction`] without duplicate work.
pub trait JointObjective {
    fn dimension(&self) -> usize;

    /// Compute `(f(x), ∇f(x))` at `x`.
    fn calculate(&self, x: &Theta) -> OptResult<(Cost, Grad)>;
}

/// Minimizer configuration.
///
/// Fields:
/// - `max_iterations` — outer-iteration budget (default 20).
/// - `max_history_size` — curvature pairs retained (default 5).
/// - `min_iterations` — convergence checks are skipped before this
///   iteration index (default 0).
/// - `initial_step_size_multiplier` — line-search shrink factor on the
///   first iteration (default 0.01).
/// - `step_size_multiplier` — shrink factor afterwards (default 0.5).
/// - `finish_on_first_converge` — return on the first converged check
///   instead of clearing history and confirming (default `false`).
/// - `verbose` — log history resets and budget exhaustion.
/// - `check_empirical_gradient` — run the finite-difference checker at
///   every iterate (diagnostic only).
/// - `throw_exception_on_step_size_underflow` — turn persistent underflow
///   into [`OptError::StepSizeUnderflow`](crate::optimization::errors::OptError::StepSizeUnderflow).
/// - `max_history_resets` — bound on history clears per `minimize` call
///   (default unbounded).
/// - `clear_history_on_minimize` — start every `minimize` call from an
///   empty history (default `true`); set to `false` to warm-start from the
///   previous call's curvature pairs.
/// - `line_search_max_iterations` — optional cap on backtracking trials.
///
/// Setters validate their input and leave the options untouched on error.
#[derive(Debug, Clone, PartialEq)]
pub struct LbfgsOptions {
    pub max_iterations: usize,
    pub max_history_size: usize,
    pub min_iterations: usize,
    pub initial_step_size_multiplier: f64,
    pub step_size_multiplier: f64,
    pub finish_on_first_converge: bool,
    pub verbose: bool,
    pub check_empirical_gradient: bool,
    pub throw_exception_on_step_size_underflow: bool,
    pub max_history_resets: usize,
    pub clear_history_on_minimize: bool,
    pub line_search_max_iterations: Option<usize>,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_history_size: DEFAULT_HISTORY_SIZE,
            min_iterations: 0,
            initial_step_size_multiplier: DEFAULT_INITIAL_STEP_SIZE_MULTIPLIER,
            step_size_multiplier: DEFAULT_STEP_SIZE_MULTIPLIER,
            finish_on_first_converge: false,
            verbose: false,
            check_empirical_gradient: false,
            throw_exception_on_step_size_underflow: false,
            max_history_resets: usize::MAX,
            clear_history_on_minimize: true,
            line_search_max_iterations: None,
        }
    }
}

impl LbfgsOptions {
    /// Re-run every field check; used when options are built by struct literal.
    ///
    /// # Errors
    /// The first failing check among iteration budget, history size, and the
    /// two step multipliers.
    pub fn validate(&self) -> OptResult<()> {
        verify_max_iter(self.max_iterations)?;
        verify_history_size(self.max_history_size)?;
        verify_step_multiplier(self.initial_step_size_multiplier)?;
        verify_step_multiplier(self.step_size_multiplier)?;
        Ok(())
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> OptResult<()> {
        verify_max_iter(max_iterations)?;
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn set_max_history_size(&mut self, max_history_size: usize) -> OptResult<()> {
        verify_history_size(max_history_size)?;
        self.max_history_size = max_history_size;
        Ok(())
    }

    pub fn set_initial_step_size_multiplier(&mut self, multiplier: f64) -> OptResult<()> {
        verify_step_multiplier(multiplier)?;
        self.initial_step_size_multiplier = multiplier;
        Ok(())
    }

    pub fn set_step_size_multiplier(&mut self, multiplier: f64) -> OptResult<()> {
        verify_step_multiplier(multiplier)?;
        self.step_size_multiplier = multiplier;
        Ok(())
    }

    /// Shrink factor the line search uses on outer iteration `iteration`.
    pub fn multiplier_for_iteration(&self, iteration: usize) -> f64 {
        if iteration == 0 { self.initial_step_size_multiplier } else { self.step_size_multiplier }
    }
}

/// How a minimization run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative objective change fell below the tolerance (confirmed).
    Converged,
    /// Iteration budget spent without convergence.
    Exhausted,
    /// Line search kept underflowing after all allowed history resets.
    StepSizeUnderflow,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Converged => "Converged",
            Termination::Exhausted => "Exhausted",
            Termination::StepSizeUnderflow => "StepSizeUnderflow",
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`LbfgsMinimizer::minimize_detailed`](super::minimizer::LbfgsMinimizer::minimize_detailed).
///
/// - `theta_hat`: final point.
/// - `value`: objective value at `theta_hat`.
/// - `converged`: `true` iff `termination == Termination::Converged`.
/// - `termination`: terminal state of the run.
/// - `iterations`: outer iterations started (retries after a history reset
///   do not count twice).
/// - `history_resets`: history clears performed during the call.
/// - `grad_norm`: Euclidean norm of the gradient at `theta_hat`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeOutcome {
    pub theta_hat: Theta,
    pub value: Cost,
    pub converged: bool,
    pub termination: Termination,
    pub iterations: usize,
    pub history_resets: usize,
    pub grad_norm: f64,
}

impl MinimizeOutcome {
    /// Build a validated outcome from the final minimizer state.
    ///
    /// # Errors
    /// - [`OptError::InvalidThetaInput`](crate::optimization::errors::OptError::InvalidThetaInput)
    ///   if the final point has non-finite entries.
    /// - [`OptError::NonFiniteCost`](crate::optimization::errors::OptError::NonFiniteCost)
    ///   if the final value is not finite.
    pub fn new(
        theta_hat: Theta, value: Cost, grad: &Grad, termination: Termination, iterations: usize,
        history_resets: usize,
    ) -> OptResult<Self> {
        validate_theta(&theta_hat, theta_hat.len())?;
        validate_value(value)?;
        Ok(Self {
            theta_hat,
            value,
            converged: termination == Termination::Converged,
            termination,
            iterations,
            history_resets,
            grad_norm: l2_norm(grad.view()),
        })
    }
}
