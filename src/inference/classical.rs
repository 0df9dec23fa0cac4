use serde::{Deserialize, Serialize};

use crate::data::Spectrum;
use crate::error::Result;
use crate::forest::RandomForest;
use crate::preprocess::{process, PreprocessingConfig};
use crate::reconcile::{FeatureReconciler, WavenumberGrid};

use super::prediction::{Diagnosis, DiagnosticPrediction};

/// Serialised classical model: the forest plus everything needed to
/// condition inputs exactly as during training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalArtifact {
    pub forest: RandomForest,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub grid: Option<WavenumberGrid>,
}

#[derive(Debug, Clone)]
pub struct ClassicalBackend {
    artifact: ClassicalArtifact,
    reconciler: FeatureReconciler,
}

impl ClassicalBackend {
    pub fn new(artifact: ClassicalArtifact) -> Self {
        let reconciler = FeatureReconciler::for_model(artifact.forest.n_features(), artifact.grid);
        Self {
            artifact,
            reconciler,
        }
    }

    pub fn input_length(&self) -> usize {
        self.reconciler.target_len()
    }

    pub fn preprocessing(&self) -> &PreprocessingConfig {
        &self.artifact.preprocessing
    }

    pub fn try_predict(&self, spectrum: &Spectrum) -> Result<DiagnosticPrediction> {
        let processed = process(spectrum, &self.artifact.preprocessing);
        let features = self.reconciler.reconcile(spectrum.x(), &processed)?;
        let proba = self.artifact.forest.predict_proba(&features);
        let class = usize::from(proba[1] > proba[0]);
        Ok(DiagnosticPrediction {
            diagnosis: if class == 1 {
                Diagnosis::Malignant
            } else {
                Diagnosis::Benign
            },
            confidence: proba[class],
            aux_markers: None,
        })
    }
}
