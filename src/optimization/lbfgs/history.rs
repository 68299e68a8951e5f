//! lbfgs::history — bounded curvature-pair memory and the two-loop recursion.
//!
//! Purpose
//! -------
//! Hold the most recent `m` curvature pairs `(s_k, y_k)` and turn them into
//! an implicit inverse-Hessian approximation `H` that can be applied to a
//! gradient in `O(m · n)` without ever forming a matrix.
//!
//! Key behaviors
//! -------------
//! - [`CurvatureHistory::push`] inserts the newest pair at the front and
//!   evicts the oldest one once `capacity` is exceeded (FIFO eviction,
//!   newest-first reads).
//! - [`CurvatureHistory::initial_scale`] returns the standard L-BFGS
//!   diagonal scaling `γ = ⟨y₀, s₀⟩ / ⟨y₀, y₀⟩` from the newest pair, or
//!   `1.0` with no history.
//! - [`CurvatureHistory::implicit_multiply`] runs the two-loop recursion and
//!   returns `H · g` (not negated).
//!
//! Invariants & assumptions
//! ------------------------
//! - `len() ≤ capacity()` at all times; `s` and `y` are stored together so
//!   the two sequences can never disagree in length.
//! - All stored vectors have the same length as the gradients passed to
//!   `implicit_multiply`.
//! - A pair with `⟨s, y⟩ == 0.0` makes the recursion undefined and is
//!   reported as [`OptError::CurvatureFailure`] when it is used.
use std::collections::VecDeque;

use crate::optimization::{
    errors::{OptError, OptResult},
    lbfgs::types::{Grad, Theta},
    vector_ops::{axpy_in_place, inner_prod, scale_in_place},
};

/// One curvature pair: position change `s = x' − x`, gradient change `y = g' − g`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvaturePair {
    pub s: Theta,
    pub y: Grad,
}

/// Newest-first, capacity-bounded list of curvature pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvatureHistory {
    pairs: VecDeque<CurvaturePair>,
    capacity: usize,
}

impl CurvatureHistory {
    pub fn new(capacity: usize) -> Self {
        Self { pairs: VecDeque::with_capacity(capacity + 1), capacity }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound, dropping the oldest pairs if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.pairs.truncate(capacity);
    }

    /// Pair `i`, where `0` is the newest.
    pub fn get(&self, i: usize) -> Option<&CurvaturePair> {
        self.pairs.get(i)
    }

    /// Newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &CurvaturePair> {
        self.pairs.iter()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Insert a new pair at the front, evicting the oldest past capacity.
    pub fn push(&mut self, s: Theta, y: Grad) {
        self.pairs.push_front(CurvaturePair { s, y });
        while self.pairs.len() > self.capacity {
            self.pairs.pop_back();
        }
    }

    /// Diagonal scaling `γ` of the initial inverse Hessian `H₀ = γ I`.
    pub fn initial_scale(&self) -> f64 {
        match self.pairs.front() {
            Some(newest) => {
                let num = inner_prod(newest.y.view(), newest.s.view());
                let den = inner_prod(newest.y.view(), newest.y.view());
                num / den
            }
            None => 1.0,
        }
    }

    /// Apply the implicit inverse Hessian to `grad` via the two-loop recursion.
    ///
    /// First loop (newest → oldest):
    /// `ρ_i = ⟨s_i, y_i⟩`, `α_i = ⟨s_i, q⟩ / ρ_i`, `q ← q − α_i y_i`.
    /// Then `q ← γ q`. Second loop (oldest → newest):
    /// `β = ⟨y_i, q⟩ / ρ_i`, `q ← q + (α_i − β) s_i`.
    ///
    /// # Errors
    /// [`OptError::CurvatureFailure`] with the pair index (0 = newest) when
    /// some `ρ_i` is exactly zero.
    pub fn implicit_multiply(&self, gamma: f64, grad: &Grad) -> OptResult<Grad> {
        let m = self.pairs.len();
        let mut rho = vec![0.0; m];
        let mut alpha = vec![0.0; m];
        let mut q = grad.clone();

        for (i, pair) in self.pairs.iter().enumerate() {
            rho[i] = inner_prod(pair.s.view(), pair.y.view());
            if rho[i] == 0.0 {
                return Err(OptError::CurvatureFailure { index: i });
            }
            alpha[i] = inner_prod(pair.s.view(), q.view()) / rho[i];
            axpy_in_place(q.view_mut(), -alpha[i], pair.y.view());
        }

        scale_in_place(q.view_mut(), gamma);

        for (i, pair) in self.pairs.iter().enumerate().rev() {
            let beta = inner_prod(pair.y.view(), q.view()) / rho[i];
            axpy_in_place(q.view_mut(), alpha[i] - beta, pair.s.view());
        }
        Ok(q)
    }
}
