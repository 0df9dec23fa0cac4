//! Savitzky–Golay smoothing (local polynomial regression).
//!
//! Interior points use the convolution coefficients of a least-squares
//! polynomial fitted over a centred window. The first and last half-windows
//! are taken from a polynomial fitted to the first/last full window, so the
//! output keeps the input length and polynomials up to `polyorder` pass
//! through unchanged.

use nalgebra::{DMatrix, DVector};

use crate::math::pseudo_inverse;

pub const DEFAULT_WINDOW_LENGTH: usize = 11;
pub const DEFAULT_POLYORDER: usize = 3;

/// Effective odd window for a signal of `n` samples.
///
/// Even windows grow by one; windows at least as long as the signal shrink to
/// the largest odd value `<= n - 1`.
fn effective_window(window_length: usize, n: usize) -> usize {
    let mut w = window_length | 1;
    if w >= n {
        w = if n % 2 == 0 { n.saturating_sub(1) } else { n.saturating_sub(2) };
    }
    w
}

/// Smooth with the default window (11) and polynomial order (3).
pub fn smooth(y: &[f64]) -> Vec<f64> {
    savgol(y, DEFAULT_WINDOW_LENGTH, DEFAULT_POLYORDER)
}

/// Savitzky–Golay filter. Best effort: when no valid window exists for this
/// signal the input is returned unchanged and a warning is logged.
pub fn savgol(y: &[f64], window_length: usize, polyorder: usize) -> Vec<f64> {
    let n = y.len();
    let w = effective_window(window_length, n);
    if w <= polyorder || w < 3 {
        log::warn!(
            "smoothing fallback: window {w} (requested {window_length}) cannot fit order {polyorder} on {n} samples; signal passed through"
        );
        return y.to_vec();
    }

    let m = w / 2;
    let design = DMatrix::from_fn(w, polyorder + 1, |i, j| (i as f64 - m as f64).powi(j as i32));
    let Some(pinv) = pseudo_inverse(&design) else {
        log::warn!("smoothing fallback: singular Savitzky–Golay design (window {w}, order {polyorder})");
        return y.to_vec();
    };

    let mut out = vec![0.0; n];

    // Interior: centre value of the local fit is row 0 of the pseudo-inverse.
    let coeffs: Vec<f64> = pinv.row(0).iter().copied().collect();
    for i in m..n - m {
        out[i] = coeffs
            .iter()
            .zip(&y[i - m..=i + m])
            .map(|(c, v)| c * v)
            .sum();
    }

    // Edges: evaluate the polynomial fitted to the first / last full window.
    let eval = |poly: &DVector<f64>, t: f64| -> f64 {
        poly.iter().rev().fold(0.0, |acc, c| acc * t + c)
    };
    let head = &pinv * DVector::from_column_slice(&y[..w]);
    for (i, o) in out.iter_mut().enumerate().take(m) {
        *o = eval(&head, i as f64 - m as f64);
    }
    let tail = &pinv * DVector::from_column_slice(&y[n - w..]);
    for (i, o) in out.iter_mut().enumerate().skip(n - m) {
        *o = eval(&tail, (i - (n - w)) as f64 - m as f64);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_forced_odd_and_clamped() {
        assert_eq!(effective_window(10, 100), 11);
        assert_eq!(effective_window(11, 10), 9);
        assert_eq!(effective_window(11, 9), 7);
        assert_eq!(effective_window(11, 0), 0);
    }

    #[test]
    fn cubic_passes_through_unchanged() {
        let y: Vec<f64> = (0..25)
            .map(|i| {
                let t = i as f64 * 0.1;
                1.0 - 2.0 * t + 0.5 * t * t - 0.3 * t * t * t
            })
            .collect();
        let s = smooth(&y);
        for (a, b) in y.iter().zip(&s) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn spike_is_attenuated() {
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 4.0, 3.0, 2.0, 1.0];
        let s = smooth(&y);
        assert_eq!(s.len(), y.len());
        assert!(s[5] < 100.0);
        assert!(s.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn too_short_signal_passes_through() {
        let y = [1.0, 5.0, 2.0];
        assert_eq!(smooth(&y), y.to_vec());
        assert_eq!(smooth(&[]), Vec::<f64>::new());
    }
}
