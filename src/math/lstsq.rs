//! Least squares through SVD.
//!
//! Polynomial baselines and Savitzky–Golay coefficients are both small dense
//! regressions. SVD keeps them stable for tall design matrices and lets us
//! detect rank deficiency explicitly instead of returning garbage.

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff below which a direction counts as lost.
const RANK_TOL: f64 = 1e-12;

fn rank_cutoff(max_sv: f64) -> f64 {
    max_sv * RANK_TOL
}

/// Solve `min ||x β - y||²`.
///
/// Returns `None` when `x` is rank deficient (fewer independent columns than
/// parameters) or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() || x.nrows() != y.len() {
        return None;
    }
    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !max_sv.is_finite() || max_sv <= 0.0 {
        return None;
    }
    if svd.rank(rank_cutoff(max_sv)) < x.ncols() {
        return None;
    }
    let beta = svd.solve(y, rank_cutoff(max_sv)).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// Moore–Penrose pseudo-inverse of a full-column-rank matrix.
pub fn pseudo_inverse(x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if x.nrows() < x.ncols() {
        return None;
    }
    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !max_sv.is_finite() || max_sv <= 0.0 || svd.rank(rank_cutoff(max_sv)) < x.ncols() {
        return None;
    }
    svd.pseudo_inverse(rank_cutoff(max_sv)).ok()
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
    fn rank_deficient_design_is_rejected() {
        // Two identical columns.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
        assert!(pseudo_inverse(&x).is_none());
    }

    #[test]
    fn underdetermined_system_is_rejected() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }
}
