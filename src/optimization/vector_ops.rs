//! vector_ops — dense `f64` vector primitives used by the L-BFGS stack.
//!
//! Purpose
//! -------
//! Collect the small set of element-wise operations the minimizer, line
//! searcher, and caching decorator need (linear combinations, inner
//! products, scaling, max-abs, exact comparison) behind names that read
//! like the algorithm, with in-place variants where the hot loop benefits.
//!
//! Invariants & assumptions
//! ------------------------
//! - Binary operations assume equal lengths; callers validate shapes at
//!   the public boundary, so mismatches here are programming errors and
//!   are caught by `debug_assert!` only.
//! - Nothing here allocates except the functions that return a new array.
//!
//! Conventions
//! -----------
//! - All functions take `ArrayView1` / `ArrayViewMut1` so both owned
//!   arrays (`&theta.view()`) and slices of larger buffers can be passed.
//! - This module never logs, performs I/O, or touches global state.
use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};

/// Linear combination `x1 · a + x2 · b` as a new array.
pub fn comb(a: ArrayView1<f64>, x1: f64, b: ArrayView1<f64>, x2: f64) -> Array1<f64> {
    debug_assert_eq!(a.len(), b.len());
    Zip::from(&a).and(&b).map_collect(|&ai, &bi| x1 * ai + x2 * bi)
}

/// In-place `y += alpha · x`.
pub fn axpy_in_place(mut y: ArrayViewMut1<f64>, alpha: f64, x: ArrayView1<f64>) {
    debug_assert_eq!(y.len(), x.len());
    y.scaled_add(alpha, &x);
}

/// Inner product `⟨a, b⟩`.
pub fn inner_prod(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.dot(&b)
}

/// In-place scaling `v *= alpha`.
pub fn scale_in_place(mut v: ArrayViewMut1<f64>, alpha: f64) {
    v.mapv_inplace(|vi| vi * alpha);
}

/// Element-wise product `a ⊙ b` as a new array.
pub fn pointwise_mult(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    debug_assert_eq!(a.len(), b.len());
    &a * &b
}

/// Largest absolute entry; `0.0` for an empty vector.
pub fn max_abs(v: ArrayView1<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, &vi| acc.max(vi.abs()))
}

/// Euclidean norm.
pub fn l2_norm(v: ArrayView1<f64>) -> f64 {
    v.dot(&v).sqrt()
}

/// Copy `src` into `dst` without reallocating.
pub fn copy_into(mut dst: ArrayViewMut1<f64>, src: ArrayView1<f64>) {
    debug_assert_eq!(dst.len(), src.len());
    dst.assign(&src);
}

/// Bit-for-bit equality of two vectors.
///
/// Unlike `==`, this treats `NaN` payloads as equal to themselves and
/// distinguishes `0.0` from `-0.0`, which is what a memoizing cache keyed
/// on the exact input needs.
pub fn bitwise_eq(a: ArrayView1<f64>, b: ArrayView1<f64>) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Linear combinations and in-place updates against hand-computed values.
    // - Edge behavior of `max_abs` on empty input and `bitwise_eq` on signed
    //   zeros / NaN.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify `comb`, `axpy_in_place`, and `inner_prod` on small vectors.
    //
    // Given
    // -----
    // - a = [1, 2, 3], b = [4, -1, 0.5].
    //
    // Expect
    // ------
    // - 2a - b = [-2, 5, 5.5]; a + 0.5 b = [3, 1.5, 3.25]; ⟨a, b⟩ = 3.5.
    fn linear_combinations_match_hand_values() {
        // Arrange
        let a = array![1.0, 2.0, 3.0];
        let b = array![4.0, -1.0, 0.5];

        // Act
        let c = comb(a.view(), 2.0, b.view(), -1.0);
        let mut y = a.clone();
        axpy_in_place(y.view_mut(), 0.5, b.view());
        let dot = inner_prod(a.view(), b.view());

        // Assert
        assert_eq!(c, array![-2.0, 5.0, 5.5]);
        assert_eq!(y, array![3.0, 1.5, 3.25]);
        assert_abs_diff_eq!(dot, 3.5, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Check scaling, pointwise products, norms and copies.
    //
    // Given
    // -----
    // - v = [3, -4].
    //
    // Expect
    // ------
    // - -2v = [-6, 8]; v ⊙ v = [9, 16]; ||v|| = 5; max|v| = 4; copy is exact.
    fn scaling_and_norms() {
        // Arrange
        let v = array![3.0, -4.0];
        let mut scaled = v.clone();
        let mut dst = Array1::<f64>::zeros(2);

        // Act
        scale_in_place(scaled.view_mut(), -2.0);
        let squared = pointwise_mult(v.view(), v.view());
        copy_into(dst.view_mut(), v.view());

        // Assert
        assert_eq!(scaled, array![-6.0, 8.0]);
        assert_eq!(squared, array![9.0, 16.0]);
        assert_abs_diff_eq!(l2_norm(v.view()), 5.0, epsilon = 1e-15);
        assert_eq!(max_abs(v.view()), 4.0);
        assert_eq!(max_abs(Array1::<f64>::zeros(0).view()), 0.0);
        assert_eq!(dst, v);
    }

    #[test]
    // Purpose
    // -------
    // Pin down the exact-comparison semantics used by the cache.
    //
    // Given
    // -----
    // - Vectors differing only by the sign of zero, and vectors with NaN.
    //
    // Expect
    // ------
    // - Signed zeros compare unequal; identical NaNs compare equal;
    //   different lengths compare unequal.
    fn bitwise_eq_semantics() {
        // Arrange
        let pos = array![0.0, 1.0];
        let neg = array![-0.0, 1.0];
        let nan = array![f64::NAN, 1.0];

        // Act / Assert
        assert!(!bitwise_eq(pos.view(), neg.view()));
        assert!(bitwise_eq(nan.view(), nan.clone().view()));
        assert!(!bitwise_eq(pos.view(), array![0.0].view()));
        assert!(bitwise_eq(pos.view(), pos.clone().view()));
    }
}
