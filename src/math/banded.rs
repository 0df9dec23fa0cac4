//! Symmetric positive definite pentadiagonal systems.
//!
//! The ALS baseline solves `(W + λ·D·Dᵀ) z = W y` where `D` is a second
//! difference operator, so the matrix has exactly two off-diagonals on each
//! side. An `LDLᵀ` factorisation restricted to that band runs in `O(L)` time
//! and memory, which matters for spectra with thousands of samples.

/// Symmetric matrix with bandwidth 2, stored by diagonals.
///
/// `off1[i]` is entry `(i, i+1)`, `off2[i]` is entry `(i, i+2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricBanded {
    pub diag: Vec<f64>,
    pub off1: Vec<f64>,
    pub off2: Vec<f64>,
}

impl SymmetricBanded {
    pub fn zeros(n: usize) -> Self {
        Self {
            diag: vec![0.0; n],
            off1: vec![0.0; n.saturating_sub(1)],
            off2: vec![0.0; n.saturating_sub(2)],
        }
    }

    /// `D·Dᵀ` for the `n × (n-2)` second-difference operator whose column `j`
    /// holds `[1, -2, 1]` at rows `j..j+2`.
    pub fn second_difference_gram(n: usize) -> Self {
        const STENCIL: [f64; 3] = [1.0, -2.0, 1.0];
        let mut m = Self::zeros(n);
        for j in 0..n.saturating_sub(2) {
            for a in 0..3 {
                for b in a..3 {
                    m.add(j + a, j + b, STENCIL[a] * STENCIL[b]);
                }
            }
        }
        m
    }

    fn len(&self) -> usize {
        self.diag.len()
    }

    /// Add `v` to entry `(i, j)` with `i <= j <= i + 2`.
    fn add(&mut self, i: usize, j: usize, v: f64) {
        match j - i {
            0 => self.diag[i] += v,
            1 => self.off1[i] += v,
            2 => self.off2[i] += v,
            _ => unreachable!("entry outside the band"),
        }
    }

    /// `self * scale + diag(extra)`.
    pub fn scaled_plus_diagonal(&self, scale: f64, extra: &[f64]) -> Self {
        Self {
            diag: self
                .diag
                .iter()
                .zip(extra)
                .map(|(d, e)| d * scale + e)
                .collect(),
            off1: self.off1.iter().map(|v| v * scale).collect(),
            off2: self.off2.iter().map(|v| v * scale).collect(),
        }
    }

    /// Solve `A x = b`. Returns `None` if `A` is not positive definite.
    pub fn solve(&self, b: &[f64]) -> Option<Vec<f64>> {
        let n = self.len();
        if b.len() != n {
            return None;
        }
        // L has unit diagonal; l1[i] = L(i, i-1), l2[i] = L(i, i-2).
        let mut d = vec![0.0; n];
        let mut l1 = vec![0.0; n];
        let mut l2 = vec![0.0; n];

        for i in 0..n {
            if i >= 2 {
                l2[i] = self.off2[i - 2] / d[i - 2];
            }
            if i >= 1 {
                let mut num = self.off1[i - 1];
                if i >= 2 {
                    num -= l2[i] * d[i - 2] * l1[i - 1];
                }
                l1[i] = num / d[i - 1];
            }
            let mut di = self.diag[i];
            if i >= 1 {
                di -= l1[i] * l1[i] * d[i - 1];
            }
            if i >= 2 {
                di -= l2[i] * l2[i] * d[i - 2];
            }
            if !(di.is_finite() && di > 0.0) {
                return None;
            }
            d[i] = di;
        }

        // Forward: L z = b.
        let mut z = vec![0.0; n];
        for i in 0..n {
            let mut v = b[i];
            if i >= 1 {
                v -= l1[i] * z[i - 1];
            }
            if i >= 2 {
                v -= l2[i] * z[i - 2];
            }
            z[i] = v;
        }
        // Diagonal, then back: Lᵀ x = z / d.
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut v = z[i] / d[i];
            if i + 1 < n {
                v -= l1[i + 1] * x[i + 1];
            }
            if i + 2 < n {
                v -= l2[i + 2] * x[i + 2];
            }
            x[i] = v;
        }
        x.iter().all(|v| v.is_finite()).then_some(x)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use super::*;

    fn to_dense(m: &SymmetricBanded) -> DMatrix<f64> {
        let n = m.len();
        let mut a = DMatrix::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = m.diag[i];
            if i + 1 < n {
                a[(i, i + 1)] = m.off1[i];
                a[(i + 1, i)] = m.off1[i];
            }
            if i + 2 < n {
                a[(i, i + 2)] = m.off2[i];
                a[(i + 2, i)] = m.off2[i];
            }
        }
        a
    }

    #[test]
    fn gram_matches_dense_product() {
        let n = 6;
        let mut d = DMatrix::zeros(n, n - 2);
        for j in 0..n - 2 {
            d[(j, j)] = 1.0;
            d[(j + 1, j)] = -2.0;
            d[(j + 2, j)] = 1.0;
        }
        let dense = &d * d.transpose();
        let banded = to_dense(&SymmetricBanded::second_difference_gram(n));
        assert!((dense - banded).abs().max() < 1e-12);
    }

    #[test]
    fn solve_agrees_with_dense_solver() {
        let n = 9;
        let w: Vec<f64> = (0..n).map(|i| 0.2 + 0.1 * i as f64).collect();
        let a = SymmetricBanded::second_difference_gram(n).scaled_plus_diagonal(50.0, &w);
        let b: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();

        let x = a.solve(&b).unwrap();
        let dense = to_dense(&a);
        let expected = dense.lu().solve(&DVector::from_vec(b)).unwrap();
        for i in 0..n {
            assert!((x[i] - expected[i]).abs() < 1e-9, "x[{i}]");
        }
    }

    #[test]
    fn indefinite_matrix_is_rejected() {
        let a = SymmetricBanded::second_difference_gram(5);
        // D·Dᵀ alone is singular.
        assert!(a.solve(&[1.0; 5]).is_none());
    }
}
