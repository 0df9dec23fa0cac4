//! Random forest classifier backing the classical model.
//!
//! Bootstrap-aggregated CART trees; every tree gets its own RNG seeded from
//! the forest seed and the tree index, so fitting is reproducible no matter
//! how rayon schedules the trees.

pub mod tree;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use tree::{DecisionTree, TreeNode, TreeParams};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed ^ (tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl RandomForest {
    /// Fit on `rows` (all the same length) with binary `labels`.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: &ForestParams) -> Result<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(Error::TrainingDataInsufficient(format!(
                "{} feature rows for {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|r| r.len() != n_features) {
            return Err(Error::TrainingDataInsufficient(
                "feature rows must share a non-zero length".into(),
            ));
        }

        let n = rows.len();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            max_features: ((n_features as f64).sqrt() as usize).max(1),
        };
        let trees = (0..params.n_estimators.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, t));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(rows, labels, bootstrap, tree_params, &mut rng)
            })
            .collect();

        Ok(Self { n_features, trees })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the trees' leaf class frequencies.
    pub fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        let mut acc = [0.0; 2];
        for tree in &self.trees {
            let p = tree.predict_proba(row);
            acc[0] += p[0];
            acc[1] += p[1];
        }
        let k = self.trees.len().max(1) as f64;
        [acc[0] / k, acc[1] / k]
    }

    /// Most probable class; ties go to class 0.
    pub fn predict(&self, row: &[f64]) -> u8 {
        let p = self.predict_proba(row);
        u8::from(p[1] > p[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n: usize) -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let label = (i % 2) as u8;
            let shift = if label == 1 { 5.0 } else { 0.0 };
            rows.push((0..16).map(|j| shift + ((i * 7 + j * 3) % 5) as f64 * 0.1).collect());
            labels.push(label);
        }
        (rows, labels)
    }

    #[test]
    fn learns_separable_classes() {
        let (rows, labels) = separable(40);
        let params = ForestParams {
            n_estimators: 15,
            ..Default::default()
        };
        let forest = RandomForest::fit(&rows, &labels, &params).unwrap();
        assert_eq!(forest.n_features(), 16);
        assert_eq!(forest.n_estimators(), 15);
        for (row, &label) in rows.iter().zip(&labels) {
            assert_eq!(forest.predict(row), label);
            let p = forest.predict_proba(row);
            assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let (rows, labels) = separable(30);
        let params = ForestParams {
            n_estimators: 8,
            ..Default::default()
        };
        let a = RandomForest::fit(&rows, &labels, &params).unwrap();
        let b = RandomForest::fit(&rows, &labels, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(RandomForest::fit(&rows, &[0, 1], &ForestParams::default()).is_err());
        assert!(RandomForest::fit(&[], &[], &ForestParams::default()).is_err());
    }
}
