//! CART classification tree on two classes, Gini impurity.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// Tree node. Leaves keep class counts so probabilities follow the
/// (bootstrap-weighted) training frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        counts: [u32; 2],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Candidate features drawn (without replacement) at every split.
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
}

fn gini(counts: [u32; 2]) -> f64 {
    let n = f64::from(counts[0] + counts[1]);
    if n == 0.0 {
        return 0.0;
    }
    let p0 = f64::from(counts[0]) / n;
    let p1 = f64::from(counts[1]) / n;
    1.0 - p0 * p0 - p1 * p1
}

fn class_counts(labels: &[u8], idx: &[usize]) -> [u32; 2] {
    let mut counts = [0u32; 2];
    for &i in idx {
        counts[usize::from(labels[i] != 0)] += 1;
    }
    counts
}

struct Builder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    params: TreeParams,
    n_features: usize,
}

impl Builder<'_> {
    fn build(&self, idx: &mut [usize], depth: usize, rng: &mut StdRng) -> TreeNode {
        let counts = class_counts(self.labels, idx);
        let pure = counts[0] == 0 || counts[1] == 0;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || idx.len() < self.params.min_samples_split {
            return TreeNode::Leaf { counts };
        }

        let Some((feature, threshold)) = self.best_split(idx, counts, rng) else {
            return TreeNode::Leaf { counts };
        };

        // Partition in place: left side holds values <= threshold.
        let mut split = 0;
        for k in 0..idx.len() {
            if self.rows[idx[k]][feature] <= threshold {
                idx.swap(k, split);
                split += 1;
            }
        }
        if split == 0 || split == idx.len() {
            return TreeNode::Leaf { counts };
        }
        let (left, right) = idx.split_at_mut(split);
        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.build(left, depth + 1, rng)),
            right: Box::new(self.build(right, depth + 1, rng)),
        }
    }

    fn best_split(&self, idx: &[usize], counts: [u32; 2], rng: &mut StdRng) -> Option<(usize, f64)> {
        let n = idx.len();
        let k = self.params.max_features.clamp(1, self.n_features);
        let mut best: Option<(f64, usize, f64)> = None;
        let mut order: Vec<usize> = idx.to_vec();

        for feature in sample(rng, self.n_features, k).into_iter() {
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left = [0u32; 2];
            for pos in 0..n - 1 {
                left[usize::from(self.labels[order[pos]] != 0)] += 1;
                let v = self.rows[order[pos]][feature];
                let next = self.rows[order[pos + 1]][feature];
                if next <= v {
                    continue;
                }
                let right = [counts[0] - left[0], counts[1] - left[1]];
                let nl = (pos + 1) as f64;
                let nr = (n - pos - 1) as f64;
                let impurity = (nl * gini(left) + nr * gini(right)) / n as f64;
                if best.map_or(true, |(b, _, _)| impurity < b) {
                    // Midpoint of adjacent floats can round up to `next`.
                    let mut threshold = v + (next - v) / 2.0;
                    if threshold >= next {
                        threshold = v;
                    }
                    best = Some((impurity, feature, threshold));
                }
            }
        }
        best.map(|(_, f, t)| (f, t))
    }
}

impl DecisionTree {
    /// Grow a tree on the rows named by `idx` (duplicates allowed, as in a
    /// bootstrap sample).
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[u8],
        mut idx: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        if n_features == 0 || idx.is_empty() {
            return Self {
                root: TreeNode::Leaf {
                    counts: class_counts(labels, &idx),
                },
            };
        }
        let builder = Builder {
            rows,
            labels,
            params,
            n_features,
        };
        Self {
            root: builder.build(&mut idx, 0, rng),
        }
    }

    /// Class probabilities `[p(0), p(1)]` of the leaf `row` falls into.
    pub fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { counts } => {
                    let n = f64::from(counts[0] + counts[1]);
                    if n == 0.0 {
                        return [0.5, 0.5];
                    }
                    return [f64::from(counts[0]) / n, f64::from(counts[1]) / n];
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(n: &TreeNode) -> usize {
            match n {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}
