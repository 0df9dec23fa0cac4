use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::inference::BackendKind;

/// One row of the version catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: u64,
    /// Unique across the catalog.
    pub version_label: String,
    pub artifact_path: PathBuf,
    pub backend_kind: BackendKind,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
    pub is_active: bool,
    /// Network input length; neural versions only.
    #[serde(default)]
    pub input_length: Option<usize>,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the caller supplies when registering a version; the registry
/// assigns the id, the timestamp and the active flag.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub version_label: String,
    pub artifact_path: PathBuf,
    pub backend_kind: BackendKind,
    pub accuracy: Option<f64>,
    pub metrics: BTreeMap<String, serde_json::Value>,
    pub input_length: Option<usize>,
    pub description: String,
}

/// `v{YYYYMMDDHHMM}` for the given instant.
pub fn default_version_label(at: DateTime<Utc>) -> String {
    format!("v{}", at.format("%Y%m%d%H%M"))
}

/// Labels name artifact files inside the models directory, so they must
/// stay a single plain path component.
pub fn validate_label(label: &str) -> Result<()> {
    let bad = label.trim().is_empty()
        || label.contains("..")
        || label.chars().any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if bad {
        return Err(Error::InvalidConfig(format!("invalid version label '{label}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn label_is_minute_resolution() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 59).unwrap();
        assert_eq!(default_version_label(at), "v202403070905");
    }

    #[test]
    fn labels_must_be_one_path_component() {
        for ok in ["v1", "v202403070905", "cnn-x", "run_2.b"] {
            assert!(validate_label(ok).is_ok(), "{ok}");
        }
        for bad in ["", "  ", "../x", "a/b", "a\\b", "..", "c:x", "tab\there"] {
            assert!(matches!(validate_label(bad), Err(Error::InvalidConfig(_))), "{bad:?}");
        }
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let json = r#"{
            "id": 1, "version_label": "v1", "artifact_path": "models/rf_v1.json",
            "backend_kind": "classical", "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let v: ModelVersion = serde_json::from_str(json).unwrap();
        assert_eq!(v.backend_kind, BackendKind::Classical);
        assert!(v.metrics.is_empty());
        assert_eq!(v.accuracy, None);
    }
}
