//! Feature-length reconciliation.
//!
//! Models take a fixed number of features; spectra arrive with whatever
//! length and range the instrument produced. The reconciler resamples a
//! conditioned spectrum onto the model's length by piecewise-linear
//! interpolation (linear extrapolation at the edges). This loses
//! information whenever the grids differ, and the two resampling domains
//! below are not interchangeable: a model must be served with the policy it
//! was trained with, which is why the grid is stored in its artifact.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::{interp_linear, linspace};

/// Relative difference in point count still treated as "the same grid".
const LENGTH_TOLERANCE: f64 = 0.10;

// ---------------------------------------------------------------------------
// WavenumberGrid – a model's physical feature axis, when known
// ---------------------------------------------------------------------------

/// Evenly spaced wavenumber axis, `len` points from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavenumberGrid {
    pub start: f64,
    pub end: f64,
    pub len: usize,
}

impl WavenumberGrid {
    /// 400–2200 cm⁻¹ at unit spacing.
    pub const CANONICAL: WavenumberGrid = WavenumberGrid {
        start: 400.0,
        end: 2200.0,
        len: 1801,
    };

    pub fn points(&self) -> Vec<f64> {
        linspace(self.start, self.end, self.len)
    }

    /// Whether `x` plausibly samples this grid: similar point count and an
    /// overlapping wavenumber range.
    pub fn plausibly_matches(&self, x: &[f64]) -> bool {
        let (Some(&first), Some(&last)) = (x.first(), x.last()) else {
            return false;
        };
        let len_gap = (x.len() as f64 - self.len as f64).abs() / self.len as f64;
        len_gap <= LENGTH_TOLERANCE && first < self.end && last > self.start
    }

    /// Grid to record for a model trained on `axes` at `target_len` features:
    /// the canonical grid when every training axis plausibly samples it.
    pub fn for_training<'a, I>(target_len: usize, axes: I) -> Option<WavenumberGrid>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let grid = Self::CANONICAL;
        if target_len != grid.len {
            return None;
        }
        let mut any = false;
        for x in axes {
            if !grid.plausibly_matches(x) {
                return None;
            }
            any = true;
        }
        any.then_some(grid)
    }
}

// ---------------------------------------------------------------------------
// FeatureReconciler
// ---------------------------------------------------------------------------

/// Which abscissa the interpolation runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleDomain {
    /// Source and target both spread over `[0, 1]` by index.
    NormalizedIndex,
    /// Source wavenumbers mapped onto the model's known grid.
    Wavenumber,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureReconciler {
    target_len: usize,
    grid: Option<WavenumberGrid>,
}

impl FeatureReconciler {
    /// Domain-agnostic reconciler for a model expecting `target_len` features.
    pub fn new(target_len: usize) -> Self {
        Self {
            target_len,
            grid: None,
        }
    }

    /// Reconciler for a model whose features sit on `grid`.
    pub fn with_grid(grid: WavenumberGrid) -> Self {
        Self {
            target_len: grid.len,
            grid: Some(grid),
        }
    }

    /// Reconciler for a model with `target_len` features and an optional
    /// known grid (ignored if its length disagrees).
    pub fn for_model(target_len: usize, grid: Option<WavenumberGrid>) -> Self {
        match grid {
            Some(g) if g.len == target_len => Self::with_grid(g),
            _ => Self::new(target_len),
        }
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn domain_for(&self, x: &[f64]) -> ResampleDomain {
        match self.grid {
            Some(grid) if grid.plausibly_matches(x) => ResampleDomain::Wavenumber,
            _ => ResampleDomain::NormalizedIndex,
        }
    }

    /// Resample `y` (on wavenumbers `x`) to the target length. A spectrum that
    /// already has the target length is returned unchanged.
    pub fn reconcile(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        let n = y.len();
        if n == self.target_len {
            return Ok(y.to_vec());
        }
        let mismatch = |reason: &str| Error::FeatureMismatch {
            expected: self.target_len,
            actual: n,
            reason: reason.to_string(),
        };
        if n < 2 {
            return Err(mismatch("need at least 2 points to interpolate"));
        }

        let domain = if x.len() == n {
            self.domain_for(x)
        } else {
            ResampleDomain::NormalizedIndex
        };
        log::debug!(
            "Resampling {n} features to {} on {domain:?} domain",
            self.target_len
        );

        let resampled = match (domain, self.grid) {
            (ResampleDomain::Wavenumber, Some(grid)) => interp_linear(x, y, &grid.points()),
            _ => interp_linear(
                &linspace(0.0, 1.0, n),
                y,
                &linspace(0.0, 1.0, self.target_len),
            ),
        };
        resampled.ok_or_else(|| mismatch("interpolation failed on the source axis"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_length_is_identity() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let r = FeatureReconciler::new(50);
        assert_eq!(r.reconcile(&x, &y).unwrap(), y);
    }

    #[test]
    fn normalized_index_keeps_endpoints() {
        let y = [0.0, 1.0, 2.0, 3.0];
        let out = FeatureReconciler::new(7).reconcile(&[], &y).unwrap();
        assert_eq!(out.len(), 7);
        assert_eq!(out[0], 0.0);
        assert!((out[6] - 3.0).abs() < 1e-12);
        assert!((out[3] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn wavenumber_domain_preserves_physical_alignment() {
        // 1700 points over 450..2149: plausible for the canonical grid.
        let x: Vec<f64> = (0..1700).map(|i| 450.0 + i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let r = FeatureReconciler::with_grid(WavenumberGrid::CANONICAL);
        assert_eq!(r.domain_for(&x), ResampleDomain::Wavenumber);

        let out = r.reconcile(&x, &y).unwrap();
        assert_eq!(out.len(), 1801);
        // Linear data stays linear in wavenumber, extrapolated at both ends.
        assert!((out[0] - 800.0).abs() < 1e-6);
        assert!((out[600] - 2000.0).abs() < 1e-6);
        assert!((out[1800] - 4400.0).abs() < 1e-6);
    }

    #[test]
    fn implausible_axis_falls_back_to_index_domain() {
        let r = FeatureReconciler::with_grid(WavenumberGrid::CANONICAL);
        let short: Vec<f64> = (0..100).map(|i| 400.0 + 18.0 * i as f64).collect();
        assert_eq!(r.domain_for(&short), ResampleDomain::NormalizedIndex);
        let shifted: Vec<f64> = (0..1801).map(|i| 3000.0 + i as f64).collect();
        assert_eq!(r.domain_for(&shifted), ResampleDomain::NormalizedIndex);
    }

    #[test]
    fn single_point_is_a_feature_mismatch() {
        let err = FeatureReconciler::new(10).reconcile(&[1.0], &[1.0]).unwrap_err();
        assert!(matches!(err, Error::FeatureMismatch { expected: 10, actual: 1, .. }));
    }

    #[test]
    fn training_grid_requires_every_axis_to_match() {
        let good: Vec<f64> = (0..1801).map(|i| 400.0 + i as f64).collect();
        let bad: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(
            WavenumberGrid::for_training(1801, [good.as_slice()]),
            Some(WavenumberGrid::CANONICAL)
        );
        assert_eq!(
            WavenumberGrid::for_training(1801, [good.as_slice(), bad.as_slice()]),
            None
        );
        assert_eq!(WavenumberGrid::for_training(500, [good.as_slice()]), None);
    }
}
