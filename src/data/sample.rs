use serde::{Deserialize, Serialize};

use super::labels::{parse_diagnosis, parse_er_pr, parse_her2, parse_ki67, MISSING_LABEL};
use super::model::{SpectralDataset, Spectrum, SpectrumRecord};

/// Metadata columns consulted for the diagnosis label, in order.
pub const DIAGNOSIS_COLUMNS: [&str; 2] = ["diagnosis", "diagnosis_result"];

// ---------------------------------------------------------------------------
// AuxMarker – the auxiliary biomarker tasks
// ---------------------------------------------------------------------------

/// Auxiliary biomarkers predicted next to the diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuxMarker {
    #[serde(rename = "ER")]
    Er,
    #[serde(rename = "PR")]
    Pr,
    #[serde(rename = "HER2")]
    Her2,
    #[serde(rename = "Ki67")]
    Ki67,
}

impl AuxMarker {
    /// Head order of the network and of `TrainingSample::aux_labels`.
    pub const ALL: [AuxMarker; 4] = [AuxMarker::Er, AuxMarker::Pr, AuxMarker::Her2, AuxMarker::Ki67];

    pub fn name(self) -> &'static str {
        match self {
            AuxMarker::Er => "ER",
            AuxMarker::Pr => "PR",
            AuxMarker::Her2 => "HER2",
            AuxMarker::Ki67 => "Ki67",
        }
    }

    /// Parse this marker's raw metadata text into `{-1, 0, 1}`.
    pub fn parse(self, value: Option<&str>) -> i8 {
        match self {
            AuxMarker::Er | AuxMarker::Pr => parse_er_pr(value),
            AuxMarker::Her2 => parse_her2(value),
            AuxMarker::Ki67 => parse_ki67(value),
        }
    }
}

// ---------------------------------------------------------------------------
// TrainingSample
// ---------------------------------------------------------------------------

/// One labeled spectrum. `aux_labels` follows [`AuxMarker::ALL`]; entries are
/// `-1` (missing), `0` or `1`.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    pub spectrum: Spectrum,
    pub diagnosis_label: u8,
    pub aux_labels: [i8; 4],
}

impl TrainingSample {
    /// Sample without auxiliary ground truth.
    pub fn new(spectrum: Spectrum, diagnosis_label: u8) -> Self {
        Self {
            spectrum,
            diagnosis_label,
            aux_labels: [MISSING_LABEL; 4],
        }
    }

    pub fn with_aux_labels(mut self, aux_labels: [i8; 4]) -> Self {
        self.aux_labels = aux_labels;
        self
    }

    /// Build a sample from a stored record; `None` when the record has no
    /// readable diagnosis.
    pub fn from_record(record: &SpectrumRecord) -> Option<Self> {
        let text = |col: &str| {
            record
                .metadata
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(col))
                .and_then(|(_, v)| v.as_text())
        };
        let diagnosis_label = DIAGNOSIS_COLUMNS
            .iter()
            .find_map(|col| parse_diagnosis(text(col).as_deref()))?;

        let aux_labels = AuxMarker::ALL.map(|m| m.parse(text(m.name()).as_deref()));
        Some(Self {
            spectrum: record.spectrum.clone(),
            diagnosis_label,
            aux_labels,
        })
    }
}

/// Turn the selected records into training samples, skipping unlabeled ones.
pub fn build_training_samples(dataset: &SpectralDataset, indices: &[usize]) -> Vec<TrainingSample> {
    indices
        .iter()
        .filter_map(|&i| {
            let sample = TrainingSample::from_record(&dataset.records[i]);
            if sample.is_none() {
                log::debug!("Record {i} has no readable diagnosis; skipped");
            }
            sample
        })
        .collect()
}
