//! Where the version catalog lives. The registry only needs to read and
//! replace the whole list; it enforces the catalog invariants itself.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

use super::version::ModelVersion;

pub trait VersionStore: Send + Sync {
    fn load(&self) -> Result<Vec<ModelVersion>>;
    fn save(&self, versions: &[ModelVersion]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    versions: Mutex<Vec<ModelVersion>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(versions: Vec<ModelVersion>) -> Self {
        Self {
            versions: Mutex::new(versions),
        }
    }
}

impl VersionStore for MemoryStore {
    fn load(&self) -> Result<Vec<ModelVersion>> {
        Ok(self.versions.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, versions: &[ModelVersion]) -> Result<()> {
        *self.versions.lock().unwrap_or_else(PoisonError::into_inner) = versions.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Catalog kept as a pretty-printed JSON array. A missing file is an empty
/// catalog; saves go through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VersionStore for JsonFileStore {
    fn load(&self) -> Result<Vec<ModelVersion>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, versions: &[ModelVersion]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(versions)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::inference::BackendKind;

    fn version(id: u64) -> ModelVersion {
        ModelVersion {
            id,
            version_label: format!("v{id}"),
            artifact_path: PathBuf::from(format!("rf_v{id}.json")),
            backend_kind: BackendKind::Classical,
            accuracy: Some(0.9),
            metrics: Default::default(),
            is_active: id == 2,
            input_length: None,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn json_store_round_trips_and_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/registry.json"));
        assert!(store.load().unwrap().is_empty());

        let versions = vec![version(1), version(2)];
        store.save(&versions).unwrap();
        assert_eq!(store.load().unwrap(), versions);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn memory_store_replaces_contents() {
        let store = MemoryStore::with_versions(vec![version(1)]);
        store.save(&[version(2)]).unwrap();
        assert_eq!(store.load().unwrap()[0].id, 2);
    }
}
