//! lbfgs::cache — memoize the last `(point, value, gradient)` of an objective.
//!
//! Purpose
//! -------
//! Line searches and the outer L-BFGS loop ask for `value_at(x)` and
//! `derivative_at(x)` back-to-back at the same point. For objectives where
//! both come out of one expensive pass ([`JointObjective`]), this decorator
//! runs that pass once per distinct point and serves the second request
//! from memory.
//!
//! Key behaviors
//! -------------
//! - A request whose point is bit-for-bit equal to the cached point returns
//!   the cached value/gradient without recomputation.
//! - Any other point triggers exactly one `calculate` call; value, gradient
//!   and a copy of the point replace the previous entry.
//! - [`CachingDifferentiableFunction::clear_cache`] drops the entry.
//!
//! Invariants & assumptions
//! ------------------------
//! - At most one triple is retained.
//! - The wrapped objective is deterministic; a cached answer is assumed to
//!   equal a fresh one.
//! - Interior mutability through `RefCell` makes the type `!Sync`: one
//!   instance must not be shared between threads.
//!
//! Testing notes
//! -------------
//! - Unit tests count `calculate` calls through a `Cell` in the test
//!   objective to pin down the "exactly once per distinct point" rule.
use std::cell::{Cell, RefCell};

use crate::optimization::{
    errors::OptResult,
    lbfgs::{
        traits::{DifferentiableFunction, JointObjective},
        types::{Cost, Grad, Theta},
        validation::{validate_grad, validate_value},
    },
    vector_ops::bitwise_eq,
};

#[derive(Debug, Clone)]
struct CacheEntry {
    x: Theta,
    value: Cost,
    grad: Grad,
}

/// [`DifferentiableFunction`] view of a [`JointObjective`] with a one-entry cache.
#[derive(Debug)]
pub struct CachingDifferentiableFunction<C: JointObjective> {
    inner: C,
    last: RefCell<Option<CacheEntry>>,
    calculations: Cell<usize>,
}

impl<C: JointObjective> CachingDifferentiableFunction<C> {
    pub fn new(inner: C) -> Self {
        Self { inner, last: RefCell::new(None), calculations: Cell::new(0) }
    }

    /// Forget the cached triple; the next request recomputes.
    pub fn clear_cache(&self) {
        self.last.replace(None);
    }

    /// Number of times the wrapped `calculate` has run.
    pub fn calculate_count(&self) -> usize {
        self.calculations.get()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Serve `read` from the cache at `x`, running `calculate` on a miss.
    ///
    /// # Errors
    /// Propagates failures from `calculate`, and rejects non-finite values
    /// or malformed gradients before they are cached.
    fn with_entry<T>(&self, x: &Theta, read: impl FnOnce(&CacheEntry) -> T) -> OptResult<T> {
        if let Some(entry) = self.last.borrow().as_ref() {
            if bitwise_eq(entry.x.view(), x.view()) {
                return Ok(read(entry));
            }
        }
        let (value, grad) = self.inner.calculate(x)?;
        self.calculations.set(self.calculations.get() + 1);
        validate_value(value)?;
        validate_grad(&grad, self.inner.dimension())?;
        let entry = CacheEntry { x: x.clone(), value, grad };
        let out = read(&entry);
        self.last.replace(Some(entry));
        Ok(out)
    }
}

impl<C: JointObjective> DifferentiableFunction for CachingDifferentiableFunction<C> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn value_at(&self, x: &Theta) -> OptResult<Cost> {
        self.with_entry(x, |entry| entry.value)
    }

    fn derivative_at(&self, x: &Theta) -> OptResult<Grad> {
        self.with_entry(x, |entry| entry.grad.clone())
    }
}
