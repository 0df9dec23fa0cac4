/// Scale to `[0, 1]` over the whole vector. A constant vector maps to zeros.
pub fn normalize_minmax(y: &[f64]) -> Vec<f64> {
    let min = y.iter().copied().fold(f64::INFINITY, f64::min);
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        return vec![0.0; y.len()];
    }
    y.iter().map(|v| (v - min) / range).collect()
}

/// Standard normal variate: `(y - mean) / std` with the population standard
/// deviation. Zero spread leaves `y` unchanged.
pub fn normalize_snv(y: &[f64]) -> Vec<f64> {
    if y.is_empty() {
        return Vec::new();
    }
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;
    let std = (y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 || !std.is_finite() {
        log::warn!("snv fallback: zero spread over {} samples; signal passed through", y.len());
        return y.to_vec();
    }
    y.iter().map(|v| (v - mean) / std).collect()
}
