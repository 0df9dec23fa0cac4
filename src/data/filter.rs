use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};

use super::model::{MetadataValue, SpectralDataset};

/// Column flagging records that may be used for training.
pub const TRAINING_FLAG_COLUMN: &str = "is_training_data";

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per column
// ---------------------------------------------------------------------------

/// Per-column selection: maps column_name → set of accepted values.
/// An absent column means "no constraint".
pub type FilterState = BTreeMap<String, BTreeSet<MetadataValue>>;

/// Parse `column=value` predicates into a [`FilterState`]. Repeating a
/// column accepts any of its values.
pub fn parse_filters<S: AsRef<str>>(predicates: &[S]) -> Result<FilterState> {
    let mut filters = FilterState::new();
    for p in predicates {
        let p = p.as_ref();
        let Some((col, val)) = p.split_once('=') else {
            bail!("Filter '{p}' is not of the form column=value");
        };
        let col = col.trim();
        if col.is_empty() {
            bail!("Filter '{p}' has an empty column name");
        }
        filters
            .entry(col.to_string())
            .or_default()
            .insert(MetadataValue::String(val.trim().to_string()));
    }
    Ok(filters)
}

/// Return indices of records that pass all filters.
///
/// A record passes a column filter when:
/// * The record's value, compared as text, is in the selected set → passes
/// * The record lacks the column → passes only if `Null` is selected
pub fn filtered_indices(dataset: &SpectralDataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            filters.iter().all(|(col, selected)| match rec.metadata.get(col) {
                Some(MetadataValue::Null) | None => selected.contains(&MetadataValue::Null),
                Some(val) => {
                    let text = val.to_string();
                    selected.iter().any(|s| s == val || s.to_string() == text)
                }
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Indices eligible for training: the filter must pass and, when the
/// dataset has a [`TRAINING_FLAG_COLUMN`], the flag must be true.
pub fn training_indices(dataset: &SpectralDataset, filters: &FilterState) -> Vec<usize> {
    let flagged = dataset.unique_values.contains_key(TRAINING_FLAG_COLUMN);
    filtered_indices(dataset, filters)
        .into_iter()
        .filter(|&i| {
            !flagged
                || dataset.records[i]
                    .get(TRAINING_FLAG_COLUMN)
                    .and_then(MetadataValue::as_flag)
                    .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Spectrum, SpectrumRecord};

    fn dataset() -> SpectralDataset {
        let rec = |op: &str, train: Option<bool>| {
            let mut metadata = BTreeMap::from([(
                "operator".to_string(),
                MetadataValue::String(op.to_string()),
            )]);
            if let Some(t) = train {
                metadata.insert(TRAINING_FLAG_COLUMN.to_string(), MetadataValue::Bool(t));
            }
            SpectrumRecord {
                spectrum: Spectrum::new(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap(),
                metadata,
            }
        };
        SpectralDataset::from_records(vec![
            rec("alice", Some(true)),
            rec("bob", Some(true)),
            rec("alice", Some(false)),
            rec("alice", None),
        ])
    }

    #[test]
    fn parse_rejects_bare_words() {
        assert!(parse_filters(&["operator"]).is_err());
        let f = parse_filters(&["operator=alice", "operator=bob"]).unwrap();
        assert_eq!(f["operator"].len(), 2);
    }

    #[test]
    fn filters_compare_as_text() {
        let ds = dataset();
        let f = parse_filters(&["operator=alice"]).unwrap();
        assert_eq!(filtered_indices(&ds, &f), vec![0, 2, 3]);
        assert_eq!(filtered_indices(&ds, &FilterState::new()).len(), 4);
    }

    #[test]
    fn training_flag_gates_records_when_present() {
        let ds = dataset();
        assert_eq!(training_indices(&ds, &FilterState::new()), vec![0, 1]);
    }
}
