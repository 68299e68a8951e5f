//! rust_lbfgs — limited-memory BFGS minimization with optional Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the L-BFGS minimizer to Python via the `_rust_lbfgs` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the `optimization` module (minimizer, line search, caching
//!   decorator, gradient checker, reference solver, errors) as the public
//!   crate surface.
//! - With `python-bindings`, define the `LBFGSMinimizer` / `LBFGSOutcome`
//!   classes and the `#[pymodule]` initializer, registering an
//!   `optimization` submodule so dotted imports work.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in `optimization`; this file performs only FFI
//!   glue, argument conversion, and error mapping.
//! - Python objectives are wrapped in the caching decorator, so a callable
//!   returning `(value, gradient)` is invoked once per distinct point.
//!
//! Conventions
//! -----------
//! - Errors from Rust code are `OptError` internally and become `ValueError`
//!   at the PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Rust code depends on `optimization::prelude` and ignores the PyO3 items.
//! - Python code imports `_rust_lbfgs.optimization.LBFGSMinimizer`, usually
//!   through a thin pure-Python facade.

pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    optimization::lbfgs::{
        cache::CachingDifferentiableFunction, minimizer::LbfgsMinimizer, traits::MinimizeOutcome,
    },
    utils::{PyObjective, extract_lbfgs_options, extract_theta},
};

/// LBFGSMinimizer — Python-facing wrapper around [`LbfgsMinimizer`].
///
/// Purpose
/// -------
/// Let Python code minimize a callable `func(x) -> (value, gradient)` with the
/// crate's L-BFGS implementation, keeping curvature history inside one
/// object across calls when requested.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `LBFGSMinimizer(max_iterations=20, max_history_size=5, min_iterations=0,
/// initial_step_size_multiplier=0.01, step_size_multiplier=0.5,
/// finish_on_first_converge=False, verbose=False,
/// check_empirical_gradient=False, throw_exception_on_step_size_underflow=False,
/// max_history_resets=None, clear_history_on_minimize=True)`.
///
/// Notes
/// -----
/// - With the `obs_slog` feature, `verbose=True` also installs a terminal
///   logger so history resets, progress and exhaustion are printed to stderr.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_lbfgs.optimization", name = "LBFGSMinimizer")]
pub struct PyLbfgsMinimizer {
    inner: LbfgsMinimizer,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyLbfgsMinimizer {
    #[new]
    #[pyo3(signature = (
        max_iterations=20,
        max_history_size=5,
        min_iterations=0,
        initial_step_size_multiplier=0.01,
        step_size_multiplier=0.5,
        finish_on_first_converge=false,
        verbose=false,
        check_empirical_gradient=false,
        throw_exception_on_step_size_underflow=false,
        max_history_resets=None,
        clear_history_on_minimize=true,
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_iterations: usize, max_history_size: usize, min_iterations: usize,
        initial_step_size_multiplier: f64, step_size_multiplier: f64,
        finish_on_first_converge: bool, verbose: bool, check_empirical_gradient: bool,
        throw_exception_on_step_size_underflow: bool, max_history_resets: Option<usize>,
        clear_history_on_minimize: bool,
    ) -> PyResult<Self> {
        let opts = extract_lbfgs_options(
            max_iterations,
            max_history_size,
            min_iterations,
            initial_step_size_multiplier,
            step_size_multiplier,
            finish_on_first_converge,
            verbose,
            check_empirical_gradient,
            throw_exception_on_step_size_underflow,
            max_history_resets,
            clear_history_on_minimize,
        )?;
        #[allow(unused_mut)]
        let mut inner = LbfgsMinimizer::with_options(opts)?;
        #[cfg(feature = "obs_slog")]
        if verbose {
            inner.set_logger(crate::optimization::logging::terminal_logger());
        }
        Ok(Self { inner })
    }

    /// Minimize `func` from `x0` and return the final point.
    #[pyo3(signature = (func, x0, tolerance, print_progress=false))]
    pub fn minimize<'py>(
        &mut self, py: Python<'py>, func: &Bound<'py, PyAny>, x0: &Bound<'py, PyAny>,
        tolerance: f64, print_progress: bool,
    ) -> PyResult<Vec<f64>> {
        let outcome = self.run(py, func, x0, tolerance, print_progress)?;
        Ok(outcome.theta_hat.to_vec())
    }

    /// Minimize `func` from `x0` and return an `LBFGSOutcome`.
    #[pyo3(signature = (func, x0, tolerance, print_progress=false))]
    pub fn minimize_detailed<'py>(
        &mut self, py: Python<'py>, func: &Bound<'py, PyAny>, x0: &Bound<'py, PyAny>,
        tolerance: f64, print_progress: bool,
    ) -> PyResult<PyLbfgsOutcome> {
        let inner = self.run(py, func, x0, tolerance, print_progress)?;
        Ok(PyLbfgsOutcome { inner })
    }

    /// Drop the curvature history if resets remain; returns whether it did.
    pub fn clear_histories(&mut self) -> bool {
        self.inner.clear_histories()
    }

    #[getter]
    pub fn history_size(&self) -> usize {
        self.inner.history().len()
    }
}

#[cfg(feature = "python-bindings")]
impl PyLbfgsMinimizer {
    fn run<'py>(
        &mut self, py: Python<'py>, func: &Bound<'py, PyAny>, x0: &Bound<'py, PyAny>,
        tolerance: f64, print_progress: bool,
    ) -> PyResult<MinimizeOutcome> {
        let theta0 = extract_theta(py, x0, "x0")?;
        let objective = CachingDifferentiableFunction::new(PyObjective::new(py, func, theta0.len())?);
        let outcome = self.inner.minimize_detailed(&objective, &theta0, tolerance, print_progress)?;
        Ok(outcome)
    }
}

/// LBFGSOutcome — read-only view of a [`MinimizeOutcome`] for Python.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_lbfgs.optimization", name = "LBFGSOutcome")]
pub struct PyLbfgsOutcome {
    pub inner: MinimizeOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyLbfgsOutcome {
    #[getter]
    pub fn theta_hat(&self) -> Vec<f64> {
        self.inner.theta_hat.to_vec()
    }

    #[getter]
    pub fn value(&self) -> f64 {
        self.inner.value
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    pub fn status(&self) -> String {
        self.inner.termination.to_string()
    }

    #[getter]
    pub fn iterations(&self) -> usize {
        self.inner.iterations
    }

    #[getter]
    pub fn history_resets(&self) -> usize {
        self.inner.history_resets
    }

    #[getter]
    pub fn grad_norm(&self) -> f64 {
        self.inner.grad_norm
    }
}

/// Initialize the `_rust_lbfgs` extension module.
///
/// Creates the `optimization` submodule, attaches it to the parent module and
/// registers it in `sys.modules` as `rust_lbfgs.optimization`.
///
/// Errors
/// ------
/// - `PyErr` if creating the submodule or touching `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_lbfgs<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let optimization_mod = PyModule::new(_py, "optimization")?;
    optimization(_py, m, &optimization_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_lbfgs.optimization", optimization_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn optimization<'py>(
    _py: Python, rust_lbfgs: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<PyLbfgsMinimizer>()?;
    m.add_class::<PyLbfgsOutcome>()?;
    rust_lbfgs.add_submodule(m)?;
    Ok(())
}
