use super::config::DerivativeOrder;

/// Discrete gradient of `y` with respect to `x`.
///
/// Interior points use the second-order centred difference for uneven
/// spacing; the endpoints use one-sided first differences. Fewer than two
/// samples leave `y` unchanged.
pub fn gradient(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = y.len();
    if n < 2 || x.len() != n {
        log::warn!(
            "derivative fallback: need at least 2 paired samples, got {n} intensities and {} wavenumbers",
            x.len()
        );
        return y.to_vec();
    }
    let mut out = vec![0.0; n];
    out[0] = (y[1] - y[0]) / (x[1] - x[0]);
    out[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        let hd = x[i] - x[i - 1];
        let hs = x[i + 1] - x[i];
        out[i] = (hd * hd * y[i + 1] + (hs * hs - hd * hd) * y[i] - hs * hs * y[i - 1])
            / (hs * hd * (hd + hs));
    }
    out
}

/// `order`-th derivative; the second order applies [`gradient`] twice.
pub fn derivative(x: &[f64], y: &[f64], order: DerivativeOrder) -> Vec<f64> {
    match order {
        DerivativeOrder::None => y.to_vec(),
        DerivativeOrder::First => gradient(x, y),
        DerivativeOrder::Second => gradient(x, &gradient(x, y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_on_uneven_grid() {
        let x = [0.0, 0.5, 1.5, 2.0, 3.5, 4.0];
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let d = gradient(&x, &y);
        for i in 1..x.len() - 1 {
            assert!((d[i] - 2.0 * x[i]).abs() < 1e-12, "d[{i}] = {}", d[i]);
        }
        assert!((d[0] - (x[0] + x[1])).abs() < 1e-12);
        assert!((d[5] - (x[4] + x[5])).abs() < 1e-12);
    }

    #[test]
    fn second_order_of_cubic_is_linear_inside() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v.powi(3)).collect();
        let d2 = derivative(&x, &y, DerivativeOrder::Second);
        // Composition of centred differences: exact 6x away from the edges.
        for i in 3..17 {
            assert!((d2[i] - 6.0 * x[i]).abs() < 1e-9, "d2[{i}] = {}", d2[i]);
        }
    }

    #[test]
    fn uneven_axis_matches_uniform_slope() {
        // Same straight line sampled on an even and an uneven axis.
        let even: Vec<f64> = (0..8).map(|i| 400.0 + 2.0 * i as f64).collect();
        let uneven = [400.0, 401.0, 403.5, 404.0, 407.0, 409.5, 410.0, 414.0];
        let line = |x: &[f64]| -> Vec<f64> { x.iter().map(|v| 3.0 * v - 7.0).collect() };
        let de = gradient(&even, &line(&even));
        let du = gradient(&uneven, &line(&uneven));
        for (a, b) in de.iter().zip(&du) {
            assert!((a - 3.0).abs() < 1e-9, "even {a}");
            assert!((b - 3.0).abs() < 1e-9, "uneven {b}");
        }
    }

    #[test]
    fn single_sample_passes_through() {
        assert_eq!(gradient(&[1.0], &[5.0]), vec![5.0]);
    }
}
