//! Training orchestration.
//!
//! ```text
//!  samples ──▶ preprocess (rayon) ──▶ reconcile to input length
//!          ──▶ stratified split ──▶ fit (forest | CNN) ──▶ evaluate
//!          ──▶ write staged artifact ──▶ registry.register_staged(active) ──▶ reload
//! ```
//!
//! Training works on its own copies and touches the registry only at the
//! final register step. Nothing is written when a run fails or is cancelled,
//! and a label claimed by a concurrent run never overwrites that run's
//! artifact.

pub mod metrics;
pub mod split;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::TrainingSample;
use crate::error::{Error, Result};
use crate::forest::{ForestParams, RandomForest};
use crate::inference::artifact::{save_classical, save_neural};
use crate::inference::{BackendKind, CheckpointConfig, ClassicalArtifact, NeuralCheckpoint};
use crate::nn::{multitask_loss, sigmoid, Adam, AdamConfig, MultiTaskCnn, NetworkConfig, Tensor3};
use crate::preprocess::{process, PreprocessingConfig};
use crate::reconcile::{FeatureReconciler, WavenumberGrid};
use crate::registry::{
    default_version_label, validate_label, LoadOutcome, ModelRegistry, ModelVersion, NewVersion,
};

pub use metrics::{accuracy, ClassScores, ClassificationReport};
pub use split::stratified_split;

// ---------------------------------------------------------------------------
// Options and outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    /// Defaults to `v{YYYYMMDDHHMM}` at the start of the run.
    pub version_label: Option<String>,
    pub description: String,
    pub preprocessing: PreprocessingConfig,
    pub seed: u64,
    pub test_fraction: f64,
    pub n_estimators: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Network input length (neural only).
    pub input_length: usize,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            version_label: None,
            description: String::new(),
            preprocessing: PreprocessingConfig::default(),
            seed: 42,
            test_fraction: 0.2,
            n_estimators: 100,
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-3,
            input_length: crate::nn::DEFAULT_INPUT_LENGTH,
        }
    }
}

/// Structured result handed back to callers of [`train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TrainingOutcome {
    Success { version_label: String, accuracy: f64 },
    Error { message: String },
}

impl TrainingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrainingOutcome::Success { .. })
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Train, register and activate a new version; failures become
/// [`TrainingOutcome::Error`]. `cancel` is polled between neural epochs.
pub fn train(
    samples: &[TrainingSample],
    backend: BackendKind,
    options: &TrainingOptions,
    registry: &ModelRegistry,
    cancel: &AtomicBool,
) -> TrainingOutcome {
    match try_train(samples, backend, options, registry, cancel) {
        Ok(version) => TrainingOutcome::Success {
            version_label: version.version_label,
            accuracy: version.accuracy.unwrap_or(0.0),
        },
        Err(e) => {
            log::error!("Training failed: {e}");
            let message = match e {
                Error::TrainingDataInsufficient(_) if samples.is_empty() => {
                    "No training data found".to_string()
                }
                other => other.to_string(),
            };
            TrainingOutcome::Error { message }
        }
    }
}

pub fn try_train(
    samples: &[TrainingSample],
    backend: BackendKind,
    options: &TrainingOptions,
    registry: &ModelRegistry,
    cancel: &AtomicBool,
) -> Result<ModelVersion> {
    if samples.len() < 2 {
        return Err(Error::TrainingDataInsufficient(format!(
            "{} labeled samples, need at least 2",
            samples.len()
        )));
    }
    let label = options
        .version_label
        .clone()
        .unwrap_or_else(|| default_version_label(Utc::now()));
    validate_label(&label)?;
    // Early exit only; register_staged re-checks under the catalog lock.
    if registry.contains_label(&label)? {
        return Err(Error::DuplicateVersion(label));
    }

    log::info!(
        "Training {backend:?} model '{label}' on {} samples",
        samples.len()
    );
    let dataset = Dataset::build(samples, backend, options)?;
    let (train_idx, test_idx) =
        stratified_split(&dataset.labels, options.test_fraction, options.seed);
    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(Error::TrainingDataInsufficient(format!(
            "split left {} training and {} test samples",
            train_idx.len(),
            test_idx.len()
        )));
    }

    let staged = registry.staging_path(backend, &label);
    let (accuracy, metrics, input_length) = match backend {
        BackendKind::Classical => {
            let fitted = fit_classical(&dataset, &train_idx, &test_idx, options)?;
            save_classical(&staged, &fitted.artifact)?;
            (fitted.accuracy, fitted.metrics, None)
        }
        BackendKind::Neural => {
            let fitted = fit_neural(&dataset, &train_idx, &test_idx, options, cancel)?;
            save_neural(&staged, &fitted.checkpoint)?;
            let len = fitted.checkpoint.config.input_length;
            (fitted.accuracy, fitted.metrics, Some(len))
        }
    };
    log::info!("Model '{label}' held-out accuracy {accuracy:.4}");

    let registered = registry.register_staged(
        NewVersion {
            artifact_path: registry.artifact_path(backend, &label),
            version_label: label,
            backend_kind: backend,
            accuracy: Some(accuracy),
            metrics,
            input_length,
            description: options.description.clone(),
        },
        &staged,
        true,
    )?;
    match registered.load {
        Some(LoadOutcome::Failed { reason }) => Err(Error::ModelUnavailable(format!(
            "version '{}' was registered but could not be loaded: {reason}",
            registered.version.version_label
        ))),
        _ => Ok(registered.version),
    }
}

// ---------------------------------------------------------------------------
// Feature matrix
// ---------------------------------------------------------------------------

struct Dataset {
    rows: Vec<Vec<f64>>,
    labels: Vec<u8>,
    aux: Vec<[f64; 4]>,
    grid: Option<WavenumberGrid>,
}

impl Dataset {
    /// Condition every sample and bring it to one feature length: the
    /// network's input length, or the most common processed length for the
    /// forest.
    fn build(samples: &[TrainingSample], backend: BackendKind, options: &TrainingOptions) -> Result<Self> {
        let cfg = options.preprocessing;
        let processed: Vec<Vec<f64>> = samples
            .par_iter()
            .map(|s| process(&s.spectrum, &cfg))
            .collect();

        let target_len = match backend {
            BackendKind::Neural => options.input_length,
            BackendKind::Classical => modal_length(&processed),
        };
        let grid = WavenumberGrid::for_training(target_len, samples.iter().map(|s| s.spectrum.x()));
        let reconciler = FeatureReconciler::for_model(target_len, grid);
        let rows = samples
            .par_iter()
            .zip(&processed)
            .map(|(s, y)| reconciler.reconcile(s.spectrum.x(), y))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows,
            labels: samples.iter().map(|s| s.diagnosis_label).collect(),
            aux: samples
                .iter()
                .map(|s| s.aux_labels.map(f64::from))
                .collect(),
            grid,
        })
    }
}

/// Most frequent length; ties go to the longer one.
fn modal_length(rows: &[Vec<f64>]) -> usize {
    let mut counts = BTreeMap::new();
    for r in rows {
        *counts.entry(r.len()).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(len, n)| (n, len))
        .map_or(0, |(len, _)| len)
}

fn gather<T: Clone>(items: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| items[i].clone()).collect()
}

// ---------------------------------------------------------------------------
// Classical
// ---------------------------------------------------------------------------

struct FittedClassical {
    artifact: ClassicalArtifact,
    accuracy: f64,
    metrics: BTreeMap<String, Value>,
}

fn fit_classical(
    data: &Dataset,
    train_idx: &[usize],
    test_idx: &[usize],
    options: &TrainingOptions,
) -> Result<FittedClassical> {
    let params = ForestParams {
        n_estimators: options.n_estimators,
        seed: options.seed,
        ..ForestParams::default()
    };
    let forest = RandomForest::fit(
        &gather(&data.rows, train_idx),
        &gather(&data.labels, train_idx),
        &params,
    )?;

    let truth = gather(&data.labels, test_idx);
    let predicted: Vec<u8> = test_idx.iter().map(|&i| forest.predict(&data.rows[i])).collect();
    let report = ClassificationReport::new(&truth, &predicted);

    Ok(FittedClassical {
        accuracy: report.accuracy,
        metrics: report.to_metrics(),
        artifact: ClassicalArtifact {
            forest,
            preprocessing: options.preprocessing,
            grid: data.grid,
        },
    })
}

// ---------------------------------------------------------------------------
// Neural
// ---------------------------------------------------------------------------

struct FittedNeural {
    checkpoint: NeuralCheckpoint,
    accuracy: f64,
    metrics: BTreeMap<String, Value>,
}

fn batch_tensor(rows: &[Vec<f64>], idx: &[usize]) -> Tensor3 {
    let refs: Vec<&[f64]> = idx.iter().map(|&i| rows[i].as_slice()).collect();
    Tensor3::from_rows(&refs)
}

fn fit_neural(
    data: &Dataset,
    train_idx: &[usize],
    test_idx: &[usize],
    options: &TrainingOptions,
    cancel: &AtomicBool,
) -> Result<FittedNeural> {
    let mut net = MultiTaskCnn::new(
        NetworkConfig {
            input_length: options.input_length,
        },
        options.seed,
    )
    .map_err(Error::InvalidConfig)?;
    let mut adam = Adam::new(AdamConfig {
        lr: options.learning_rate,
        ..AdamConfig::default()
    });
    let mut rng = StdRng::seed_from_u64(options.seed);
    let batch_size = options.batch_size.max(1);
    let mut order = train_idx.to_vec();
    let mut epoch_losses = Vec::with_capacity(options.epochs);

    for epoch in 0..options.epochs {
        if cancel.load(Ordering::Relaxed) {
            log::info!("Training cancelled before epoch {}", epoch + 1);
            return Err(Error::Cancelled);
        }
        order.shuffle(&mut rng);
        let mut total = 0.0;
        for batch in order.chunks(batch_size) {
            let x = batch_tensor(&data.rows, batch);
            let diag: Vec<f64> = batch.iter().map(|&i| f64::from(data.labels[i])).collect();
            let aux: Vec<[f64; 4]> = gather(&data.aux, batch);

            let (logits, cache) = net.forward_train(&x, &mut rng);
            let (loss, grad_logits) = multitask_loss(&logits, &diag, &aux);
            let grads = net.backward(&cache, &grad_logits);
            adam.step(net.params_mut(), &grads);
            total += loss * batch.len() as f64;
        }
        let mean = total / order.len() as f64;
        log::info!("Epoch {}/{}: loss {mean:.4}", epoch + 1, options.epochs);
        epoch_losses.push(mean);
    }

    let truth = gather(&data.labels, test_idx);
    let predicted: Vec<u8> = test_idx
        .chunks(batch_size)
        .flat_map(|batch| net.forward(&batch_tensor(&data.rows, batch)))
        .map(|logits| u8::from(sigmoid(logits[0]) > 0.5))
        .collect();
    let acc = accuracy(&truth, &predicted);

    let metrics = BTreeMap::from([
        ("accuracy".to_string(), Value::from(acc)),
        ("epoch_losses".to_string(), Value::from(epoch_losses)),
    ]);
    Ok(FittedNeural {
        checkpoint: NeuralCheckpoint {
            config: CheckpointConfig {
                input_length: net.input_length,
                preprocessing: options.preprocessing,
                grid: data.grid,
            },
            weights: net,
        },
        accuracy: acc,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_length_prefers_most_common() {
        let rows = vec![vec![0.0; 3], vec![0.0; 5], vec![0.0; 3]];
        assert_eq!(modal_length(&rows), 3);
        assert_eq!(modal_length(&[vec![0.0; 2], vec![0.0; 4]]), 4);
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let ok = TrainingOutcome::Success {
            version_label: "v1".into(),
            accuracy: 0.75,
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"status": "success", "version_label": "v1", "accuracy": 0.75})
        );
        let err = TrainingOutcome::Error {
            message: "No training data found".into(),
        };
        assert_eq!(serde_json::to_value(&err).unwrap()["status"], "error");
    }
}
