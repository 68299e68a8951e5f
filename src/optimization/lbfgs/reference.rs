//! lbfgs::reference — argmin's L-BFGS as an independent reference solver.
//!
//! Purpose
//! -------
//! Run `argmin`'s L-BFGS with a More–Thuente line search on the same
//! [`DifferentiableFunction`] the in-crate minimizer consumes, so results can
//! be cross-checked against a widely used implementation.
//!
//! Key behaviors
//! -------------
//! - [`build_reference_solver`] constructs the solver with the requested
//!   memory and optional gradient/cost tolerances.
//! - [`reference_minimize`] wires the problem through [`ArgMinAdapter`],
//!   runs the executor with an iteration cap, and normalizes the final state
//!   into a [`ReferenceOutcome`].
//! - With the `obs_slog` feature and `verbose = true`, the initial state is
//!   logged and an argmin slog observer reports every iteration.
//!
//! Invariants & assumptions
//! ------------------------
//! - Options are validated on construction; the runner trusts them.
//! - argmin errors are mapped into [`OptError`] before leaving this module.
use argmin::core::{Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::quasinewton::LBFGS;
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

use crate::optimization::{
    errors::{OptError, OptResult},
    lbfgs::{
        adapter::ArgMinAdapter,
        traits::DifferentiableFunction,
        types::{Cost, DEFAULT_HISTORY_SIZE, FnEvalMap, Grad, LbfgsMoreThuente, MoreThuenteLS, Theta},
        validation::{validate_theta, validate_value, verify_history_size, verify_max_iter},
    },
    vector_ops::l2_norm,
};

/// Default iteration cap of the reference run.
pub const DEFAULT_REFERENCE_MAX_ITERS: usize = 100;

/// Reference-solver configuration.
///
/// - `memory`: curvature pairs kept by argmin's L-BFGS.
/// - `max_iters`: iteration cap.
/// - `tol_grad` / `tol_cost`: optional argmin stopping tolerances; `None`
///   keeps argmin's defaults.
/// - `verbose`: attach logging (only with the `obs_slog` feature).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceOptions {
    pub memory: usize,
    pub max_iters: usize,
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub verbose: bool,
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self {
            memory: DEFAULT_HISTORY_SIZE,
            max_iters: DEFAULT_REFERENCE_MAX_ITERS,
            tol_grad: None,
            tol_cost: None,
            verbose: false,
        }
    }
}

impl ReferenceOptions {
    /// Validated constructor.
    ///
    /// # Errors
    /// - [`OptError::InvalidHistorySize`] for zero memory.
    /// - [`OptError::InvalidMaxIter`] for a zero cap.
    /// - [`OptError::InvalidTolerance`] for a tolerance that is non-finite
    ///   or not strictly positive.
    pub fn new(
        memory: usize, max_iters: usize, tol_grad: Option<f64>, tol_cost: Option<f64>,
        verbose: bool,
    ) -> OptResult<Self> {
        verify_history_size(memory)?;
        verify_max_iter(max_iters)?;
        for tol in [tol_grad, tol_cost].into_iter().flatten() {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(OptError::InvalidTolerance {
                    tol,
                    reason: "Solver tolerances must be finite and positive.",
                });
            }
        }
        Ok(Self { memory, max_iters, tol_grad, tol_cost, verbose })
    }
}

/// Final state of a reference run.
///
/// `converged` is `true` only when argmin reports that the solver converged
/// or the target cost was reached; `status` carries argmin's status text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceOutcome {
    pub theta_hat: Theta,
    pub value: Cost,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl ReferenceOutcome {
    /// Normalize argmin's final state.
    ///
    /// # Errors
    /// - [`OptError::Backend`] when argmin returned no best point.
    /// - [`OptError::NonFiniteCost`] for a non-finite best cost.
    pub fn new(
        theta_hat: Option<Theta>, value: Cost, termination: &TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = theta_hat.ok_or_else(|| OptError::Backend {
            kind: "not initialized",
            text: "Solver finished without a best parameter.".to_string(),
        })?;
        validate_value(value)?;
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached
            )
        );
        let status = match termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            other => format!("{other:?}"),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| l2_norm(g.view())),
        })
    }
}

/// Build argmin's L-BFGS with a More–Thuente line search.
///
/// # Errors
/// Propagates argmin's rejection of a tolerance as [`OptError`].
pub fn build_reference_solver(opts: &ReferenceOptions) -> OptResult<LbfgsMoreThuente> {
    let mut solver = LBFGS::new(MoreThuenteLS::new(), opts.memory);
    if let Some(g) = opts.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// Minimize `f` from `theta0` with the reference solver.
///
/// # Errors
/// - Shape/finiteness errors for `theta0`.
/// - Objective failures and argmin runtime errors, mapped into [`OptError`].
pub fn reference_minimize<F: DifferentiableFunction + ?Sized>(
    f: &F, theta0: &Theta, opts: &ReferenceOptions,
) -> OptResult<ReferenceOutcome> {
    validate_theta(theta0, f.dimension())?;
    let problem = ArgMinAdapter::new(f);
    let solver = build_reference_solver(opts)?;
    run_reference(theta0.clone(), opts, problem, solver)
}

fn run_reference<'a, F, S>(
    theta0: Theta, opts: &ReferenceOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<ReferenceOutcome>
where
    F: DifferentiableFunction + ?Sized,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut executor = Executor::new(problem, solver);
    executor = executor.configure(|state| state.param(theta0).max_iters(opts.max_iters as u64));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        executor = executor.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }

    let mut result = executor.run()?.state().clone();
    let iterations = result.get_iter();
    let fn_evals = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    ReferenceOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        &termination,
        iterations,
        fn_evals,
        grad,
    )
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: DifferentiableFunction + ?Sized,
{
    let cost0 = problem.cost(theta0)?;
    let grad_norm0 = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    let logger = crate::optimization::logging::terminal_logger();
    slog::info!(logger, "reference run start"; "cost" => cost0, "grad_norm" => grad_norm0);
    Ok(())
}
