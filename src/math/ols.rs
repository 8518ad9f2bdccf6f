//! Least squares solver.
//!
//! Every Levenberg–Marquardt step solves a small, tall linear system:
//!
//! ```text
//! minimize |A δ - b|²
//! ```
//!
//! where `A` is the weighted Jacobian stacked on top of the damping rows.
//!
//! Implementation choices:
//! - We use SVD to solve the least-squares problem robustly even when the
//!   system is tall (more rows than columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Parameter counts are tiny (a handful of columns), so SVD cost is negligible
//!   next to the forward-model evaluations.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-12, 1e-10] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Inverse of a symmetric positive-definite matrix via Cholesky.
///
/// Returns `None` when the matrix is not positive definite (singular
/// curvature, e.g. a parameter with zero sensitivity).
pub fn spd_inverse(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let inv = m.clone().cholesky()?.inverse();
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let x = solve_least_squares(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn spd_inverse_rejects_singular() {
        let ok = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let inv = spd_inverse(&ok).unwrap();
        let id = &ok * &inv;
        assert!((id[(0, 0)] - 1.0).abs() < 1e-12);
        assert!(id[(0, 1)].abs() < 1e-12);

        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(spd_inverse(&singular).is_none());
    }
}
