use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{AuxMarker, Spectrum};
use crate::error::Result;
use crate::nn::{sigmoid, MultiTaskCnn};
use crate::preprocess::{process, PreprocessingConfig};
use crate::reconcile::{FeatureReconciler, WavenumberGrid};

use super::prediction::{DiagnosticPrediction, MarkerCall, MarkerLabel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub input_length: usize,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub grid: Option<WavenumberGrid>,
}

/// Serialised neural model: `{weights, config}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralCheckpoint {
    pub weights: MultiTaskCnn,
    pub config: CheckpointConfig,
}

#[derive(Debug, Clone)]
pub struct NeuralBackend {
    network: MultiTaskCnn,
    preprocessing: PreprocessingConfig,
    reconciler: FeatureReconciler,
}

impl NeuralBackend {
    /// Fails when the weights do not match the declared input length.
    pub fn new(checkpoint: NeuralCheckpoint) -> std::result::Result<Self, String> {
        let NeuralCheckpoint { weights, config } = checkpoint;
        if weights.input_length != config.input_length {
            return Err(format!(
                "weights expect {} inputs but config declares {}",
                weights.input_length, config.input_length
            ));
        }
        weights.validate()?;
        Ok(Self {
            reconciler: FeatureReconciler::for_model(config.input_length, config.grid),
            network: weights,
            preprocessing: config.preprocessing,
        })
    }

    pub fn input_length(&self) -> usize {
        self.network.input_length
    }

    pub fn preprocessing(&self) -> &PreprocessingConfig {
        &self.preprocessing
    }

    pub fn try_predict(&self, spectrum: &Spectrum) -> Result<DiagnosticPrediction> {
        let processed = process(spectrum, &self.preprocessing);
        let features = self.reconciler.reconcile(spectrum.x(), &processed)?;
        let logits = self.network.logits(&features);

        let mut prediction = DiagnosticPrediction::from_malignant_probability(sigmoid(logits[0]));
        let markers = AuxMarker::ALL
            .iter()
            .zip(&logits[1..])
            .map(|(&marker, &z)| {
                let score = sigmoid(z);
                let label = if score > 0.5 {
                    MarkerLabel::Positive
                } else {
                    MarkerLabel::Negative
                };
                (marker, MarkerCall { label, score })
            })
            .collect::<BTreeMap<_, _>>();
        prediction.aux_markers = Some(markers);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Diagnosis;
    use crate::nn::NetworkConfig;

    fn backend(input_length: usize) -> NeuralBackend {
        let weights = MultiTaskCnn::new(NetworkConfig { input_length }, 7).unwrap();
        NeuralBackend::new(NeuralCheckpoint {
            weights,
            config: CheckpointConfig {
                input_length,
                preprocessing: PreprocessingConfig::default(),
                grid: None,
            },
        })
        .unwrap()
    }

    #[test]
    fn reports_every_marker() {
        let b = backend(64);
        let x: Vec<f64> = (0..100).map(|i| 400.0 + 18.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| (v / 50.0).sin() + 2.0).collect();
        let p = b.try_predict(&Spectrum::new(x, y).unwrap()).unwrap();
        assert!(matches!(p.diagnosis, Diagnosis::Benign | Diagnosis::Malignant));
        assert!((0.5..=1.0).contains(&p.confidence));
        assert_eq!(p.aux_markers.unwrap().len(), 4);
    }

    #[test]
    fn mismatched_config_is_rejected() {
        let weights = MultiTaskCnn::new(NetworkConfig { input_length: 64 }, 7).unwrap();
        let err = NeuralBackend::new(NeuralCheckpoint {
            weights,
            config: CheckpointConfig {
                input_length: 1801,
                preprocessing: PreprocessingConfig::default(),
                grid: None,
            },
        });
        assert!(err.is_err());
    }
}
