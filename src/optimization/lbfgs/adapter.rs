//! Adapter that exposes a [`DifferentiableFunction`] as an `argmin` problem.
//!
//! The objective is already a minimization target, so cost and gradient are
//! passed through unchanged after the usual finiteness and shape checks.
//! Domain errors travel through argmin as boxed [`OptError`]s and are
//! recovered by `From<argmin::core::Error> for OptError`.
use argmin::core::{CostFunction, Error, Gradient};

use crate::optimization::lbfgs::{
    traits::DifferentiableFunction,
    types::{Cost, Grad, Theta},
    validation::{validate_grad, validate_theta, validate_value},
};

/// Bridges a [`DifferentiableFunction`] to `argmin`'s `CostFunction` and `Gradient`.
#[derive(Debug, Clone, Copy)]
pub struct ArgMinAdapter<'a, F: DifferentiableFunction + ?Sized> {
    pub f: &'a F,
}

impl<'a, F: DifferentiableFunction + ?Sized> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F) -> Self {
        Self { f }
    }
}

impl<F: DifferentiableFunction + ?Sized> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `f(θ)`.
    ///
    /// # Errors
    /// Dimension/finiteness errors for `θ`, objective failures, and
    /// `NonFiniteCost` for a non-finite value.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        validate_theta(theta, self.f.dimension())?;
        let output = self.f.value_at(theta)?;
        validate_value(output)?;
        Ok(output)
    }
}

impl<F: DifferentiableFunction + ?Sized> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate `∇f(θ)`.
    ///
    /// # Errors
    /// Objective failures, plus `GradientDimMismatch` / `InvalidGradient`
    /// for a malformed gradient.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let grad = self.f.derivative_at(theta)?;
        validate_grad(&grad, self.f.dimension())?;
        Ok(grad)
    }
}
