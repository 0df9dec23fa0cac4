//! Multi-task loss with masked auxiliary heads.
//!
//! The diagnosis head uses plain mean binary cross-entropy. Each auxiliary
//! head averages only over entries whose target is not the missing sentinel
//! (`-1`), so a batch with no ground truth for a head contributes nothing.

/// Weight of the summed auxiliary losses relative to the diagnosis loss.
/// Tunable; it keeps the biomarker heads subordinate to the primary task.
pub const AUX_LOSS_WEIGHT: f64 = 0.2;

/// Added to the unmasked count so an all-missing head divides safely.
pub const MASK_EPS: f64 = 1e-6;

/// Target value meaning "no ground truth".
pub const MISSING_TARGET: f64 = -1.0;

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable BCE on a logit: `max(z,0) - z·t + ln(1 + e^-|z|)`.
pub fn bce_with_logits(z: f64, t: f64) -> f64 {
    z.max(0.0) - z * t + (-z.abs()).exp().ln_1p()
}

/// Mean BCE over every entry; returns `(loss, dloss/dlogit)`.
pub fn bce_mean(logits: &[f64], targets: &[f64]) -> (f64, Vec<f64>) {
    let n = logits.len().max(1) as f64;
    let loss = logits
        .iter()
        .zip(targets)
        .map(|(&z, &t)| bce_with_logits(z, t))
        .sum::<f64>()
        / n;
    let grad = logits
        .iter()
        .zip(targets)
        .map(|(&z, &t)| (sigmoid(z) - t) / n)
        .collect();
    (loss, grad)
}

/// `sum(loss·mask) / (sum(mask) + ε)` with `mask = target != -1`; returns
/// `(loss, dloss/dlogit)`. Masked entries get zero gradient.
pub fn masked_bce_with_logits(logits: &[f64], targets: &[f64]) -> (f64, Vec<f64>) {
    let labeled = |t: f64| t != MISSING_TARGET;
    let denom = targets.iter().filter(|&&t| labeled(t)).count() as f64 + MASK_EPS;
    let mut loss = 0.0;
    let grad = logits
        .iter()
        .zip(targets)
        .map(|(&z, &t)| {
            if labeled(t) {
                loss += bce_with_logits(z, t);
                (sigmoid(z) - t) / denom
            } else {
                0.0
            }
        })
        .collect();
    (loss / denom, grad)
}

/// Total loss for a batch of five-head logits (diagnosis first, then the
/// auxiliary heads in marker order). Returns the loss and its gradient per
/// logit.
pub fn multitask_loss(
    logits: &[[f64; 5]],
    diagnosis: &[f64],
    aux: &[[f64; 4]],
) -> (f64, Vec<[f64; 5]>) {
    let column = |h: usize| logits.iter().map(|l| l[h]).collect::<Vec<_>>();
    let mut grad = vec![[0.0; 5]; logits.len()];

    let (mut total, g) = bce_mean(&column(0), diagnosis);
    for (row, gi) in grad.iter_mut().zip(g) {
        row[0] = gi;
    }
    for head in 0..4 {
        let targets: Vec<f64> = aux.iter().map(|a| a[head]).collect();
        let (l, g) = masked_bce_with_logits(&column(head + 1), &targets);
        total += AUX_LOSS_WEIGHT * l;
        for (row, gi) in grad.iter_mut().zip(g) {
            row[head + 1] = AUX_LOSS_WEIGHT * gi;
        }
    }
    (total, grad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bce_matches_naive_formula() {
        for (z, t) in [(0.3, 1.0), (-2.0, 0.0), (4.0, 0.0)] {
            let p: f64 = sigmoid(z);
            let naive = -(t * p.ln() + (1.0 - t) * (1.0 - p).ln());
            assert!((bce_with_logits(z, t) - naive).abs() < 1e-12);
        }
        // large logits stay finite
        assert!(bce_with_logits(800.0, 0.0).is_finite());
        assert!(bce_with_logits(-800.0, 1.0).is_finite());
    }

    #[test]
    fn all_missing_head_contributes_zero_not_nan() {
        let (loss, grad) = masked_bce_with_logits(&[0.5, -1.0, 3.0], &[-1.0, -1.0, -1.0]);
        assert_eq!(loss, 0.0);
        assert!(grad.iter().all(|g| *g == 0.0));
    }

    #[test]
    fn masked_entries_do_not_change_the_loss() {
        let (a, _) = masked_bce_with_logits(&[0.2, 1.5], &[1.0, 0.0]);
        let (b, g) = masked_bce_with_logits(&[0.2, 1.5, -7.0], &[1.0, 0.0, -1.0]);
        assert!((a - b).abs() < 1e-12);
        assert_eq!(g[2], 0.0);
    }

    #[test]
    fn total_weights_auxiliary_heads() {
        let logits = [[0.0; 5]];
        let (loss, grad) = multitask_loss(&logits, &[1.0], &[[1.0, -1.0, -1.0, -1.0]]);
        let ln2 = std::f64::consts::LN_2;
        let expected = ln2 + AUX_LOSS_WEIGHT * ln2 / (1.0 + MASK_EPS);
        assert!((loss - expected).abs() < 1e-12);
        assert!((grad[0][0] + 0.5).abs() < 1e-12);
        assert_eq!(grad[0][2], 0.0);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let logits = [0.7, -0.4, 2.0];
        let targets = [0.0, 1.0, -1.0];
        let (_, g) = masked_bce_with_logits(&logits, &targets);
        let h = 1e-6;
        for i in 0..2 {
            let mut p = logits;
            p[i] += h;
            let mut m = logits;
            m[i] -= h;
            let num = (masked_bce_with_logits(&p, &targets).0
                - masked_bce_with_logits(&m, &targets).0)
                / (2.0 * h);
            assert!((num - g[i]).abs() < 1e-7);
        }
    }
}
