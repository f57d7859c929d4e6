//! Power-basis polynomials `p(x) = a0 + a1 x + ... + ak x^k`.
//!
//! The fitter needs two row primitives (value and second derivative at `x`)
//! to build linear constraints on the coefficients; everything else evaluates
//! a fitted coefficient vector.

use nalgebra::{DMatrix, DVector};

/// Fill `out[j] = x^j` for `j = 0..=degree`.
///
/// # Panics
/// Panics if `out.len() != degree + 1`.
pub fn fill_value_row(x: f64, degree: usize, out: &mut [f64]) {
    assert_eq!(out.len(), degree + 1, "value row length mismatch");
    let mut pow = 1.0;
    for slot in out.iter_mut() {
        *slot = pow;
        pow *= x;
    }
}

/// Fill `out[j] = d²/dx² x^j = j (j-1) x^(j-2)` for `j = 0..=degree`.
///
/// # Panics
/// Panics if `out.len() != degree + 1`.
pub fn fill_second_derivative_row(x: f64, degree: usize, out: &mut [f64]) {
    assert_eq!(out.len(), degree + 1, "second-derivative row length mismatch");
    let mut pow = 1.0;
    for (j, slot) in out.iter_mut().enumerate() {
        if j < 2 {
            *slot = 0.0;
            continue;
        }
        *slot = (j * (j - 1)) as f64 * pow;
        pow *= x;
    }
}

/// Evaluate `p(x)` (Horner).
pub fn eval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &a| acc * x + a)
}

/// Evaluate `p''(x)`.
pub fn eval_second_derivative(coefficients: &[f64], x: f64) -> f64 {
    let mut row = vec![0.0; coefficients.len()];
    if row.is_empty() {
        return 0.0;
    }
    fill_second_derivative_row(x, coefficients.len() - 1, &mut row);
    row.iter().zip(coefficients).map(|(r, a)| r * a).sum()
}

/// Vandermonde matrix with one row per `x` and `degree + 1` columns.
pub fn vandermonde(xs: &[f64], degree: usize) -> DMatrix<f64> {
    let mut v = DMatrix::<f64>::zeros(xs.len(), degree + 1);
    let mut row = vec![0.0; degree + 1];
    for (i, &x) in xs.iter().enumerate() {
        fill_value_row(x, degree, &mut row);
        for (j, &r) in row.iter().enumerate() {
            v[(i, j)] = r;
        }
    }
    v
}

/// Evaluate the polynomial at every `x` in one matrix-vector product.
pub fn eval_many(coefficients: &[f64], xs: &[f64]) -> Vec<f64> {
    if coefficients.is_empty() {
        return vec![0.0; xs.len()];
    }
    let v = vandermonde(xs, coefficients.len() - 1);
    let a = DVector::from_column_slice(coefficients);
    (v * a).iter().copied().collect()
}
