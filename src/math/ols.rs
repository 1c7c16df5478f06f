//! Ordinary least squares solver.
//!
//! The regression price model is linear in its coefficients, so fitting is a
//! single OLS solve over the encoded feature matrix.
//!
//! Implementation choices:
//! - We use SVD to solve the least-squares problem robustly even when the
//!   design matrix is tall (many more routes than columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Encoded categorical columns can be nearly collinear (e.g. every route of
//!   one carrier departing the same hub), so we try progressively looser
//!   tolerances before giving up.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_handles_tall_overdetermined_system() {
        // Five observations of y = 10 + 2x with no noise; the solver must
        // recover the coefficients exactly.
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let mut rows = Vec::with_capacity(xs.len() * 2);
        for &x in &xs {
            rows.push(1.0);
            rows.push(x);
        }
        let x = DMatrix::from_row_slice(xs.len(), 2, &rows);
        let y = DVector::from_iterator(xs.len(), xs.iter().map(|&v| 10.0 + 2.0 * v));

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 10.0).abs() < 1e-9);
        assert!((beta[1] - 2.0).abs() < 1e-9);
    }
}
