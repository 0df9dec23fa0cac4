//! Diagnostic models.
//!
//! A [`DiagnosticModel`] is an explicit tagged union over the two backends,
//! resolved once when an artifact is loaded. Both condition the raw spectrum
//! with the preprocessing recorded at training time, reconcile it to the
//! model's input length, then score it.

pub mod artifact;
pub mod classical;
pub mod neural;
pub mod prediction;

use serde::{Deserialize, Serialize};

use crate::data::Spectrum;
use crate::error::Result;

pub use classical::{ClassicalArtifact, ClassicalBackend};
pub use neural::{CheckpointConfig, NeuralBackend, NeuralCheckpoint};
pub use prediction::{Diagnosis, DiagnosticPrediction, MarkerCall, MarkerLabel};

/// Which backend an artifact holds; stored with every model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Classical,
    Neural,
}

impl BackendKind {
    /// File-name prefix for this kind's artifacts.
    pub fn artifact_prefix(self) -> &'static str {
        match self {
            BackendKind::Classical => "rf",
            BackendKind::Neural => "cnn",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classical" | "rf" => Ok(BackendKind::Classical),
            "neural" | "cnn" => Ok(BackendKind::Neural),
            other => Err(format!("unknown backend '{other}' (expected classical or neural)")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DiagnosticModel {
    Classical(ClassicalBackend),
    Neural(NeuralBackend),
}

impl DiagnosticModel {
    pub fn kind(&self) -> BackendKind {
        match self {
            DiagnosticModel::Classical(_) => BackendKind::Classical,
            DiagnosticModel::Neural(_) => BackendKind::Neural,
        }
    }

    pub fn input_length(&self) -> usize {
        match self {
            DiagnosticModel::Classical(m) => m.input_length(),
            DiagnosticModel::Neural(m) => m.input_length(),
        }
    }

    /// Score raw `(x, y)` arrays. A descending wavenumber axis is accepted;
    /// an empty `x` stands for an index axis.
    pub fn try_predict(&self, x: &[f64], y: &[f64]) -> Result<DiagnosticPrediction> {
        let spectrum = Spectrum::from_axis(x.to_vec(), y.to_vec())?;
        match self {
            DiagnosticModel::Classical(m) => m.try_predict(&spectrum),
            DiagnosticModel::Neural(m) => m.try_predict(&spectrum),
        }
    }

    /// Like [`Self::try_predict`] but never fails: errors are logged and
    /// reported as [`Diagnosis::Error`].
    pub fn predict(&self, x: &[f64], y: &[f64]) -> DiagnosticPrediction {
        self.try_predict(x, y).unwrap_or_else(|e| {
            log::error!("{:?} model failed to score spectrum: {e}", self.kind());
            DiagnosticPrediction::error()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{ForestParams, RandomForest};
    use crate::preprocess::PreprocessingConfig;

    fn classical() -> DiagnosticModel {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let level = if i < 10 { 0.0 } else { 1.0 };
                (0..8).map(|j| level + 0.01 * j as f64).collect()
            })
            .collect();
        let labels: Vec<u8> = (0..20).map(|i| u8::from(i >= 10)).collect();
        let params = ForestParams {
            n_estimators: 10,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&rows, &labels, &params).unwrap();
        DiagnosticModel::Classical(ClassicalBackend::new(ClassicalArtifact {
            forest,
            preprocessing: PreprocessingConfig {
                smooth: false,
                baseline: false,
                normalize: false,
                ..PreprocessingConfig::default()
            },
            grid: None,
        }))
    }

    #[test]
    fn classical_confidence_is_class_probability() {
        let m = classical();
        assert_eq!(m.kind(), BackendKind::Classical);
        assert_eq!(m.input_length(), 8);
        let p = m.predict(&[], &[1.0; 8]);
        assert_eq!(p.diagnosis, Diagnosis::Malignant);
        assert!(p.confidence > 0.5 && p.confidence <= 1.0);
        assert!(p.aux_markers.is_none());
    }

    #[test]
    fn mismatched_length_is_reconciled() {
        let p = classical().predict(&[], &[0.0; 30]);
        assert_eq!(p.diagnosis, Diagnosis::Benign);
    }

    #[test]
    fn unscorable_spectrum_reports_error() {
        let p = classical().predict(&[1.0, 2.0], &[1.0]);
        assert_eq!(p.diagnosis, Diagnosis::Error);
        assert_eq!(p.confidence, 0.0);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("CNN".parse::<BackendKind>(), Ok(BackendKind::Neural));
        assert!("svm".parse::<BackendKind>().is_err());
    }
}
