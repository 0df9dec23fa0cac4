use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::AuxMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    Benign,
    Malignant,
    /// No model is loaded; a valid, displayable outcome.
    Unknown,
    /// The loaded model could not score this spectrum.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerLabel {
    Positive,
    Negative,
    Equivocal,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerCall {
    pub label: MarkerLabel,
    /// Sigmoid output of the marker's head.
    pub score: f64,
}

/// What callers receive for one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticPrediction {
    pub diagnosis: Diagnosis,
    /// Probability of the reported class, in `[0, 1]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_markers: Option<BTreeMap<AuxMarker, MarkerCall>>,
}

impl DiagnosticPrediction {
    pub fn unknown() -> Self {
        Self {
            diagnosis: Diagnosis::Unknown,
            confidence: 0.0,
            aux_markers: None,
        }
    }

    pub fn error() -> Self {
        Self {
            diagnosis: Diagnosis::Error,
            confidence: 0.0,
            aux_markers: None,
        }
    }

    /// Binary call from the malignant-class probability.
    pub fn from_malignant_probability(p: f64) -> Self {
        let (diagnosis, confidence) = if p > 0.5 {
            (Diagnosis::Malignant, p)
        } else {
            (Diagnosis::Benign, 1.0 - p)
        };
        Self {
            diagnosis,
            confidence,
            aux_markers: None,
        }
    }
}
