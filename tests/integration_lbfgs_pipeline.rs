//! Integration tests for the L-BFGS minimization pipeline.
//!
//! Purpose
//! -------
//! - Validate end-to-end minimization through the public surface: objective
//!   contract, caching decorator, minimizer, logging, and the argmin
//!   reference solver.
//! - Use classic test problems (Rosenbrock, SPD quadratics) rather than
//!   one-dimensional toys only.
//!
//! Coverage
//! --------
//! - `optimization::lbfgs::minimizer`: convergence on Rosenbrock and a 3-D
//!   quadratic, progress logging, diagnostic gradient checks.
//! - `optimization::lbfgs::cache`: one computation per distinct point when
//!   driven by the minimizer.
//! - `optimization::lbfgs::reference`: agreement with argmin's L-BFGS.
//!
//! Exclusions
//! ----------
//! - Local contracts of history, line search and validation helpers; these
//!   are covered by unit tests.
//! - Python bindings, which need an interpreter.
use std::{
    cell::Cell,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use approx::assert_abs_diff_eq;
use ndarray::{Array2, array};
use rust_lbfgs::optimization::{
    errors::OptResult,
    lbfgs::{
        CachingDifferentiableFunction, DifferentiableFunction, JointObjective, LbfgsMinimizer,
        ReferenceOptions, Termination, reference_minimize,
        types::{Cost, Grad, Theta},
    },
};
use slog::{Drain, Level, Logger, Never, OwnedKVList, Record, o};

/// Two-dimensional Rosenbrock function with minimum 0 at (1, 1).
struct Rosenbrock;

impl DifferentiableFunction for Rosenbrock {
    fn dimension(&self) -> usize {
        2
    }

    fn value_at(&self, x: &Theta) -> OptResult<Cost> {
        Ok((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2))
    }

    fn derivative_at(&self, x: &Theta) -> OptResult<Grad> {
        let inner = x[1] - x[0] * x[0];
        Ok(array![-2.0 * (1.0 - x[0]) - 400.0 * x[0] * inner, 200.0 * inner])
    }
}

/// ½ xᵀ A x − bᵀ x computed in one pass, counting passes.
struct CountingQuadratic {
    a: Array2<f64>,
    b: Theta,
    passes: Cell<usize>,
}

impl CountingQuadratic {
    fn new() -> Self {
        Self {
            a: Array2::from_shape_vec((3, 3), vec![3.0, 1.0, 0.0, 1.0, 4.0, 1.0, 0.0, 1.0, 5.0])
                .unwrap(),
            b: array![1.0, 0.0, -1.0],
            passes: Cell::new(0),
        }
    }
}

impl JointObjective for CountingQuadratic {
    fn dimension(&self) -> usize {
        3
    }

    fn calculate(&self, x: &Theta) -> OptResult<(Cost, Grad)> {
        self.passes.set(self.passes.get() + 1);
        let ax = self.a.dot(x);
        Ok((0.5 * x.dot(&ax) - self.b.dot(x), ax - &self.b))
    }
}

/// Forwards to an inner objective while counting requests.
struct Requests<'a, F> {
    inner: &'a F,
    count: Cell<usize>,
}

impl<F: DifferentiableFunction> DifferentiableFunction for Requests<'_, F> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn value_at(&self, x: &Theta) -> OptResult<Cost> {
        self.count.set(self.count.get() + 1);
        self.inner.value_at(x)
    }

    fn derivative_at(&self, x: &Theta) -> OptResult<Grad> {
        self.count.set(self.count.get() + 1);
        self.inner.derivative_at(x)
    }
}

/// f(x) = x² with a gradient reported as 3x.
struct WrongGradient;

impl DifferentiableFunction for WrongGradient {
    fn dimension(&self) -> usize {
        1
    }

    fn value_at(&self, x: &Theta) -> OptResult<Cost> {
        Ok(x[0] * x[0])
    }

    fn derivative_at(&self, x: &Theta) -> OptResult<Grad> {
        Ok(array![3.0 * x[0]])
    }
}

/// slog drain counting info and warning records.
#[derive(Clone, Default)]
struct CountingDrain {
    info: Arc<AtomicUsize>,
    warn: Arc<AtomicUsize>,
}

impl Drain for CountingDrain {
    type Ok = ();
    type Err = Never;

    fn log(&self, record: &Record, _values: &OwnedKVList) -> Result<(), Never> {
        match record.level() {
            Level::Info => self.info.fetch_add(1, Ordering::SeqCst),
            Level::Warning => self.warn.fetch_add(1, Ordering::SeqCst),
            _ => 0,
        };
        Ok(())
    }
}

#[test]
// Purpose
// -------
// Both solvers find the Rosenbrock minimum from the classic start.
//
// Given
// -----
// - Start (-1.2, 1); in-crate minimizer with 1000 iterations and tolerance
//   1e-14; argmin reference with 500 iterations.
//
// Expect
// ------
// - Both land within 1e-4 of (1, 1) and agree with each other.
fn rosenbrock_matches_reference_solver() {
    // Arrange
    let start = array![-1.2, 1.0];
    let mut minimizer = LbfgsMinimizer::new();
    minimizer.set_max_iterations(1000).unwrap();
    let ref_opts = ReferenceOptions::new(7, 500, None, None, false).unwrap();

    // Act
    let ours = minimizer.minimize_detailed(&Rosenbrock, &start, 1e-14, false).unwrap();
    let reference = reference_minimize(&Rosenbrock, &start, &ref_opts).unwrap();

    // Assert
    assert_eq!(ours.termination, Termination::Converged);
    for i in 0..2 {
        assert_abs_diff_eq!(ours.theta_hat[i], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(reference.theta_hat[i], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ours.theta_hat[i], reference.theta_hat[i], epsilon = 2e-4);
    }
    assert!(ours.value < 1e-8);
}

#[test]
// Purpose
// -------
// The caching decorator lets the minimizer ask for value and gradient
// separately while the joint computation runs once per distinct point.
//
// Given
// -----
// - A 3-D SPD quadratic computed jointly, wrapped in the cache and a
//   request counter.
//
// Expect
// ------
// - A x ≈ b at the result; fewer joint passes than requests; the pass
//   counter of the objective matches the decorator's count.
fn cached_objective_computes_each_point_once() {
    // Arrange
    let cached = CachingDifferentiableFunction::new(CountingQuadratic::new());
    let requests = Requests { inner: &cached, count: Cell::new(0) };
    let mut minimizer = LbfgsMinimizer::new();
    minimizer.set_max_iterations(200).unwrap();

    // Act
    let theta = minimizer.minimize(&requests, &array![0.0, 0.0, 0.0], 1e-12).unwrap();

    // Assert
    let objective = cached.inner();
    let residual = objective.a.dot(&theta) - &objective.b;
    for r in residual.iter() {
        assert_abs_diff_eq!(*r, 0.0, epsilon = 1e-6);
    }
    assert_eq!(objective.passes.get(), cached.calculate_count());
    assert!(cached.calculate_count() < requests.count.get());
}

#[test]
// Purpose
// -------
// Progress logging emits one info record per completed iteration.
//
// Given
// -----
// - f(x) = x² from 10 with print_progress and a counting slog drain.
//
// Expect
// ------
// - Converged; info records == iterations; no warnings.
fn progress_logging_reports_each_iteration() {
    // Arrange
    let drain = CountingDrain::default();
    let mut minimizer = LbfgsMinimizer::new();
    minimizer.set_logger(Logger::root(drain.clone(), o!()));

    // Act
    let out = minimizer
        .minimize_detailed(&SquareViaJoint::cached(), &array![10.0], 1e-8, true)
        .unwrap();

    // Assert
    assert!(out.converged);
    assert_eq!(drain.info.load(Ordering::SeqCst), out.iterations);
    assert_eq!(drain.warn.load(Ordering::SeqCst), 0);
}

#[test]
// Purpose
// -------
// The diagnostic gradient check logs mismatches without aborting the run.
//
// Given
// -----
// - f(x) = x² whose gradient is reported as 3x, check_empirical_gradient on.
//
// Expect
// ------
// - `minimize` returns Ok; at least one warning was logged.
fn gradient_check_warns_on_wrong_gradient() {
    // Arrange
    let drain = CountingDrain::default();
    let mut minimizer = LbfgsMinimizer::new();
    minimizer.set_logger(Logger::root(drain.clone(), o!()));
    minimizer.set_check_empirical_gradient(true);

    // Act
    let result = minimizer.minimize(&WrongGradient, &array![10.0], 1e-8);

    // Assert
    assert!(result.is_ok());
    assert!(drain.warn.load(Ordering::SeqCst) >= 1);
}

/// f(x) = x² as a joint objective.
struct SquareViaJoint;

impl SquareViaJoint {
    fn cached() -> CachingDifferentiableFunction<SquareViaJoint> {
        CachingDifferentiableFunction::new(SquareViaJoint)
    }
}

impl JointObjective for SquareViaJoint {
    fn dimension(&self) -> usize {
        1
    }

    fn calculate(&self, x: &Theta) -> OptResult<(Cost, Grad)> {
        Ok((x[0] * x[0], array![2.0 * x[0]]))
    }
}
