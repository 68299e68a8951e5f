//! utils — Python-side conversion helpers for the L-BFGS bindings.
//!
//! Purpose
//! -------
//! Keep PyO3/numpy glue out of the numerical core. This module turns Python
//! array-likes into `ndarray` vectors, wraps Python callables as
//! [`JointObjective`]s, and maps keyword arguments onto validated
//! [`LbfgsOptions`].
//!
//! Key behaviors
//! -------------
//! - [`extract_f64_array`] accepts contiguous numpy arrays, pandas Series
//!   (via `to_numpy`), or any sequence of floats.
//! - [`PyObjective`] calls `func(x)` with a numpy array and expects a
//!   `(value, gradient)` pair back; Python exceptions become
//!   `OptError::ObjectiveError`.
//! - [`extract_lbfgs_options`] builds options through the validated setters,
//!   so invalid keyword values raise `ValueError`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Everything here runs with the GIL held; nothing is shared across threads.
//! - Compiled only with the `python-bindings` feature.
#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::optimization::{
    errors::{OptError, OptResult},
    lbfgs::{
        traits::{JointObjective, LbfgsOptions},
        types::{Cost, Grad, Theta},
    },
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec / Array1 → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

/// Borrow or copy a Python array-like as a contiguous `float64` array.
///
/// Errors
/// ------
/// - `TypeError` when the object is neither a 1-D float64 array, a pandas
///   Series, nor a float sequence.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a Python array-like into an owned [`Theta`].
#[cfg(feature = "python-bindings")]
pub fn extract_theta<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Theta> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

/// Python callable `func(x) -> (value, gradient)` seen as a [`JointObjective`].
#[cfg(feature = "python-bindings")]
pub struct PyObjective<'py> {
    py: Python<'py>,
    func: Bound<'py, PyAny>,
    dim: usize,
}

#[cfg(feature = "python-bindings")]
impl<'py> PyObjective<'py> {
    /// Wrap `func` for points of length `dim`.
    ///
    /// Errors
    /// ------
    /// - `TypeError` if `func` is not callable.
    pub fn new(py: Python<'py>, func: &Bound<'py, PyAny>, dim: usize) -> PyResult<Self> {
        if !func.is_callable() {
            return Err(pyo3::exceptions::PyTypeError::new_err(
                "func must be callable as func(x) -> (value, gradient)",
            ));
        }
        Ok(Self { py, func: func.clone(), dim })
    }

    fn call(&self, x: &Theta) -> PyResult<(Cost, Grad)> {
        let arg = x.clone().into_pyarray(self.py);
        let out = self.func.call1((arg,))?;
        let (value, raw_grad): (f64, Bound<'py, PyAny>) = out.extract().map_err(|_| {
            pyo3::exceptions::PyTypeError::new_err("func must return a (value, gradient) tuple")
        })?;
        let grad = extract_theta(self.py, &raw_grad, "gradient")?;
        Ok((value, grad))
    }
}

#[cfg(feature = "python-bindings")]
impl JointObjective for PyObjective<'_> {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn calculate(&self, x: &Theta) -> OptResult<(Cost, Grad)> {
        self.call(x).map_err(|err| OptError::ObjectiveError { text: err.to_string() })
    }
}

/// Build validated [`LbfgsOptions`] from Python keyword arguments.
///
/// Errors
/// ------
/// - `ValueError` (via `From<OptError> for PyErr`) for a zero iteration
///   budget or history size, or a multiplier outside `(0, 1)`.
#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn extract_lbfgs_options(
    max_iterations: usize, max_history_size: usize, min_iterations: usize,
    initial_step_size_multiplier: f64, step_size_multiplier: f64, finish_on_first_converge: bool,
    verbose: bool, check_empirical_gradient: bool, throw_exception_on_step_size_underflow: bool,
    max_history_resets: Option<usize>, clear_history_on_minimize: bool,
) -> PyResult<LbfgsOptions> {
    let mut opts = LbfgsOptions::default();
    opts.set_max_iterations(max_iterations)?;
    opts.set_max_history_size(max_history_size)?;
    opts.set_initial_step_size_multiplier(initial_step_size_multiplier)?;
    opts.set_step_size_multiplier(step_size_multiplier)?;
    opts.min_iterations = min_iterations;
    opts.finish_on_first_converge = finish_on_first_converge;
    opts.verbose = verbose;
    opts.check_empirical_gradient = check_empirical_gradient;
    opts.throw_exception_on_step_size_underflow = throw_exception_on_step_size_underflow;
    if let Some(resets) = max_history_resets {
        opts.max_history_resets = resets;
    }
    opts.clear_history_on_minimize = clear_history_on_minimize;
    Ok(opts)
}
