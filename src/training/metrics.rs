//! Held-out evaluation: accuracy and a per-class precision/recall/F1 report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn accuracy(truth: &[u8], predicted: &[u8]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    hits as f64 / truth.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Binary classification report. Undefined ratios (no predictions or no
/// support for a class) count as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: [ClassScores; 2],
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    pub fn new(truth: &[u8], predicted: &[u8]) -> Self {
        let classes = [0u8, 1].map(|c| {
            let tp = truth.iter().zip(predicted).filter(|(t, p)| **t == c && **p == c).count();
            let predicted_c = predicted.iter().filter(|p| **p == c).count();
            let support = truth.iter().filter(|t| **t == c).count();
            let precision = ratio(tp, predicted_c);
            let recall = ratio(tp, support);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassScores {
                precision,
                recall,
                f1_score,
                support,
            }
        });

        let total: usize = classes.iter().map(|c| c.support).sum();
        let avg = |weight: &dyn Fn(&ClassScores) -> f64| {
            let w: Vec<f64> = classes.iter().map(weight).collect();
            let norm: f64 = w.iter().sum();
            let mean = |f: fn(&ClassScores) -> f64| {
                if norm == 0.0 {
                    0.0
                } else {
                    classes.iter().zip(&w).map(|(c, wi)| f(c) * wi).sum::<f64>() / norm
                }
            };
            ClassScores {
                precision: mean(|c| c.precision),
                recall: mean(|c| c.recall),
                f1_score: mean(|c| c.f1_score),
                support: total,
            }
        };

        Self {
            classes,
            accuracy: accuracy(truth, predicted),
            macro_avg: avg(&|_| 1.0),
            weighted_avg: avg(&|c| c.support as f64),
        }
    }

    /// Flat metrics map as stored on a model version: `"0"`, `"1"`,
    /// `"accuracy"`, `"macro avg"`, `"weighted avg"`.
    pub fn to_metrics(&self) -> BTreeMap<String, Value> {
        let mut m = BTreeMap::new();
        for (c, scores) in self.classes.iter().enumerate() {
            m.insert(c.to_string(), serde_json::json!(scores));
        }
        m.insert("accuracy".into(), Value::from(self.accuracy));
        m.insert("macro avg".into(), serde_json::json!(self.macro_avg));
        m.insert("weighted avg".into(), serde_json::json!(self.weighted_avg));
        m
    }
}
