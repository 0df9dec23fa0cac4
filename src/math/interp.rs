//! Piecewise-linear interpolation with linear extrapolation at both ends.

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Evaluate the polyline through `(xs, ys)` at each target.
///
/// Targets outside `[xs[0], xs[last]]` extend the first/last segment.
/// Returns `None` with fewer than 2 points, mismatched lengths, or an
/// abscissa that is not strictly increasing.
pub fn interp_linear(xs: &[f64], ys: &[f64], targets: &[f64]) -> Option<Vec<f64>> {
    let n = xs.len();
    if n < 2 || ys.len() != n || xs.windows(2).any(|w| !(w[1] > w[0])) {
        return None;
    }
    let out = targets
        .iter()
        .map(|&t| {
            // Segment k spans xs[k]..xs[k+1]; clamp so edges extrapolate.
            let k = xs.partition_point(|&x| x <= t).clamp(1, n - 1) - 1;
            let (x0, x1, y0, y1) = (xs[k], xs[k + 1], ys[k], ys[k + 1]);
            y0 + (y1 - y0) * (t - x0) / (x1 - x0)
        })
        .collect();
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_hits_both_ends() {
        let g = linspace(400.0, 2200.0, 1801);
        assert_eq!(g.len(), 1801);
        assert_eq!(g[0], 400.0);
        assert_eq!(g[1800], 2200.0);
        assert!((g[900] - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn interpolates_inside_and_extrapolates_outside() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 30.0];
        let out = interp_linear(&xs, &ys, &[-1.0, 0.5, 1.0, 1.5, 3.0]).unwrap();
        assert_eq!(out, vec![-10.0, 5.0, 10.0, 20.0, 50.0]);
    }

    #[test]
    fn needs_two_increasing_points() {
        assert!(interp_linear(&[1.0], &[1.0], &[0.5]).is_none());
        assert!(interp_linear(&[1.0, 1.0], &[1.0, 2.0], &[0.5]).is_none());
    }
}
