//! Baseline removal: polynomial fit and asymmetric least squares (ALS).
//!
//! Both return the residual `y - baseline`. On a degenerate problem they log
//! a warning and return `y` unchanged; baseline removal never aborts a run.

use nalgebra::{DMatrix, DVector};

use crate::math::{solve_least_squares, SymmetricBanded};

pub const DEFAULT_POLY_DEGREE: usize = 5;
pub const DEFAULT_ALS_LAMBDA: f64 = 1e5;
pub const DEFAULT_ALS_P: f64 = 0.01;
pub const DEFAULT_ALS_ITERATIONS: usize = 10;

/// Subtract a least-squares polynomial of `degree` fitted to `(x, y)`.
///
/// The abscissa is mapped onto `[-1, 1]` before building the Vandermonde
/// matrix; the fitted curve is the same, the conditioning is not.
pub fn baseline_poly(x: &[f64], y: &[f64], degree: usize) -> Vec<f64> {
    let n = y.len();
    if x.len() != n || n < degree + 1 {
        log::warn!(
            "poly baseline fallback: {n} samples ({} wavenumbers) cannot determine a degree-{degree} fit",
            x.len()
        );
        return y.to_vec();
    }
    let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let half = (hi - lo) / 2.0;
    if !(half.is_finite() && half > 0.0) {
        log::warn!("poly baseline fallback: wavenumber axis has no spread");
        return y.to_vec();
    }
    let mid = lo + half;
    let t: Vec<f64> = x.iter().map(|v| (v - mid) / half).collect();

    let design = DMatrix::from_fn(n, degree + 1, |i, j| t[i].powi(j as i32));
    let Some(beta) = solve_least_squares(&design, &DVector::from_column_slice(y)) else {
        log::warn!("poly baseline fallback: rank-deficient degree-{degree} fit on {n} samples");
        return y.to_vec();
    };
    let baseline = design * beta;
    y.iter().zip(baseline.iter()).map(|(v, b)| v - b).collect()
}

/// Estimate the ALS baseline `z`.
///
/// Each iteration solves `(diag(w) + lam·D·Dᵀ) z = diag(w) y` on the banded
/// system, then sets `w_i = p` where `y_i > z_i` and `1 - p` elsewhere.
/// Returns `None` if the signal is too short or the system is singular.
pub fn als_baseline(y: &[f64], lam: f64, p: f64, niter: usize) -> Option<Vec<f64>> {
    let n = y.len();
    if n < 3 || niter == 0 {
        return None;
    }
    let gram = SymmetricBanded::second_difference_gram(n);
    let mut w = vec![1.0; n];
    let mut z = Vec::new();
    for _ in 0..niter {
        let system = gram.scaled_plus_diagonal(lam, &w);
        let rhs: Vec<f64> = w.iter().zip(y).map(|(wi, yi)| wi * yi).collect();
        z = system.solve(&rhs)?;
        for ((wi, yi), zi) in w.iter_mut().zip(y).zip(&z) {
            *wi = if yi > zi { p } else { 1.0 - p };
        }
    }
    Some(z)
}

/// Subtract the ALS baseline.
pub fn baseline_als(y: &[f64], lam: f64, p: f64, niter: usize) -> Vec<f64> {
    match als_baseline(y, lam, p, niter) {
        Some(z) => y.iter().zip(&z).map(|(v, b)| v - b).collect(),
        None => {
            log::warn!(
                "ALS baseline fallback: no solution for {} samples (lam={lam}, p={p}, niter={niter})",
                y.len()
            );
            y.to_vec()
        }
    }
}
