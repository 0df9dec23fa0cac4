use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value as JsonValue;

use super::model::{MetadataValue, RawSpectrum, SpectralDataset, Spectrum, SpectrumRecord};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dataset of stored spectra from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json` – `[{ "x": [...], "y": [...], ...meta }, ...]`
/// * `.csv`  – columns `x` and `y` containing semicolon-separated floats
pub fn load_file(path: &Path) -> Result<SpectralDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Load a single spectrum (`{"x": [...], "y": [...]}`) for preprocessing or
/// prediction. The axis may be omitted or descending.
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading spectrum file '{}'", path.display()))?;
    let raw: RawSpectrum = serde_json::from_str(&text).context("parsing spectrum JSON")?;
    Spectrum::try_from(raw).context("validating spectrum")
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "x": [400.0, 401.0, ...],
///     "y": [0.12,  0.14,  ...],
///     "diagnosis": "Malignant",
///     "ER": "80%",
///     "HER2": "2+",
///     "is_training_data": true
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<SpectralDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json_records(&text)
}

pub(crate) fn parse_json_records(text: &str) -> Result<SpectralDataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut out = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let x = match obj.get("x") {
            None | Some(JsonValue::Null) => Vec::new(),
            some => json_array_to_f64(some, i, "x")?,
        };
        let y = json_array_to_f64(obj.get("y"), i, "y")?;
        let spectrum = Spectrum::from_axis(x, y).with_context(|| format!("Row {i}"))?;

        let mut metadata = BTreeMap::new();
        for (key, val) in obj {
            if key == "x" || key == "y" {
                continue;
            }
            metadata.insert(key.clone(), json_to_metadata(val));
        }

        out.push(SpectrumRecord { spectrum, metadata });
    }

    Ok(SpectralDataset::from_records(out))
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

fn json_to_metadata(val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => MetadataValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetadataValue::Float(f)
            } else {
                MetadataValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// `x` and `y` columns contain semicolon-separated floats:
///   `"400.0;401.0;402.0"`, `"0.12;0.14;0.11"`
/// All other columns are treated as metadata.
fn load_csv(path: &Path) -> Result<SpectralDataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

pub(crate) fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<SpectralDataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let x_idx = headers.iter().position(|h| h == "x");
    let y_idx = headers
        .iter()
        .position(|h| h == "y")
        .context("CSV missing 'y' column")?;

    let mut out = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let x = match x_idx.and_then(|i| record.get(i)) {
            Some(cell) if !cell.trim().is_empty() => parse_semicolon_floats(cell, row_no, "x")?,
            _ => Vec::new(),
        };
        let y = parse_semicolon_floats(record.get(y_idx).unwrap_or(""), row_no, "y")?;
        let spectrum =
            Spectrum::from_axis(x, y).with_context(|| format!("CSV row {row_no}"))?;

        let mut metadata = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if Some(col_idx) == x_idx || col_idx == y_idx {
                continue;
            }
            let col_name = &headers[col_idx];
            metadata.insert(col_name.clone(), guess_metadata_type(value));
        }

        out.push(SpectrumRecord { spectrum, metadata });
    }

    Ok(SpectralDataset::from_records(out))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

/// Typed value for a CSV cell. Spreadsheet exports spell missing values
/// and flags in several ways, so blanks and `nan`/`NA` become `Null` and
/// booleans match case-insensitively.
fn guess_metadata_type(cell: &str) -> MetadataValue {
    let s = cell.trim();
    match s.to_ascii_lowercase().as_str() {
        "" | "nan" | "na" | "n/a" | "null" => return MetadataValue::Null,
        "true" => return MetadataValue::Bool(true),
        "false" => return MetadataValue::Bool(false),
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => MetadataValue::Float(f),
        _ => MetadataValue::String(s.to_string()),
    }
}
