use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a metadata column
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value (diagnosis text, ER status, flags...).
/// Using `BTreeMap` / `BTreeSet` downstream so `MetadataValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put MetadataValue in BTreeSet --

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn discriminant(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => Ok(()),
        }
    }
}

impl MetadataValue {
    /// Text form used by the label parsers. `Null` yields `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            MetadataValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Truthiness for flag columns such as `is_training_data`.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            MetadataValue::Integer(i) => Some(*i != 0),
            MetadataValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – paired wavenumber / intensity arrays
// ---------------------------------------------------------------------------

/// One sample's response curve. Immutable once constructed: `x` is strictly
/// increasing, finite, and has the same length as `y`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Unvalidated wire form of a spectrum (`{"x": [...], "y": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpectrum {
    #[serde(default)]
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Spectrum {
    /// Validate a wavenumber/intensity pair.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::InvalidSpectrum(format!(
                "x has {} values but y has {}",
                x.len(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(Error::InvalidSpectrum("spectrum is empty".into()));
        }
        if let Some(i) = x.iter().chain(y.iter()).position(|v| !v.is_finite()) {
            return Err(Error::InvalidSpectrum(format!(
                "non-finite value at flat position {i}"
            )));
        }
        if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidSpectrum(format!(
                "wavenumbers not strictly increasing at index {}",
                i + 1
            )));
        }
        Ok(Self { x, y })
    }

    /// Like [`Spectrum::new`], but tolerant of the usual export quirks:
    /// a strictly decreasing axis is reversed (together with `y`), and an
    /// empty axis becomes the sample index `0..len(y)`.
    pub fn from_axis(mut x: Vec<f64>, mut y: Vec<f64>) -> Result<Self> {
        if x.is_empty() {
            x = (0..y.len()).map(|i| i as f64).collect();
        } else if x.len() > 1 && x.windows(2).all(|w| w[1] < w[0]) {
            x.reverse();
            y.reverse();
        }
        Self::new(x, y)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

impl TryFrom<RawSpectrum> for Spectrum {
    type Error = Error;

    fn try_from(raw: RawSpectrum) -> Result<Self> {
        Spectrum::from_axis(raw.x, raw.y)
    }
}

// ---------------------------------------------------------------------------
// SpectrumRecord / SpectralDataset – stored spectra with their metadata
// ---------------------------------------------------------------------------

/// A stored spectrum with its dynamic metadata columns.
#[derive(Debug, Clone)]
pub struct SpectrumRecord {
    pub spectrum: Spectrum,
    /// column_name → value (diagnosis, ER, PR, HER2, Ki67, flags...).
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl SpectrumRecord {
    pub fn get(&self, column: &str) -> Option<&MetadataValue> {
        self.metadata.get(column)
    }
}

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone, Default)]
pub struct SpectralDataset {
    pub records: Vec<SpectrumRecord>,
    /// Ordered list of metadata column names (excludes x, y).
    pub column_names: Vec<String>,
    /// For each metadata column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<MetadataValue>>,
}

impl SpectralDataset {
    /// Build column indices from the loaded records.
    pub fn from_records(records: Vec<SpectrumRecord>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        let mut unique_values: BTreeMap<String, BTreeSet<MetadataValue>> = BTreeMap::new();

        for rec in &records {
            for (col, val) in &rec.metadata {
                column_names_set.insert(col.clone());
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        SpectralDataset {
            records,
            column_names,
            unique_values,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
