//! Model-version lifecycle.
//!
//! ```text
//!   VersionStore (catalog)          ModelRegistry
//!   ┌──────────────────────┐        ┌──────────────────────────────┐
//!   │ v1  is_active=false  │ load   │ catalog: Mutex  (writers)     │
//!   │ v2  is_active=true ──┼──────▶ │ active: RwLock<Option<Arc<…>>>│──▶ predict
//!   └──────────────────────┘        └──────────────────────────────┘
//! ```
//!
//! Catalog mutations (register, activate, reload) are serialised by one
//! mutex. The active model is built off to the side and published with a
//! short write lock, so in-flight predictions keep the model they started
//! with.

pub mod store;
pub mod version;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::inference::artifact::load_model;
use crate::inference::{BackendKind, DiagnosticModel, DiagnosticPrediction};

pub use store::{JsonFileStore, MemoryStore, VersionStore};
pub use version::{default_version_label, validate_label, ModelVersion, NewVersion};

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// A loaded model together with the catalog row it came from.
#[derive(Debug)]
pub struct LoadedModel {
    pub version: ModelVersion,
    pub model: DiagnosticModel,
}

/// Result of [`ModelRegistry::load_active`]. Failures are reported here and
/// logged, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded { version_label: String },
    /// No version is flagged active; the cached model was dropped.
    NoActiveVersion,
    /// The active version could not be loaded; any previous model stays.
    Failed { reason: String },
}

/// A freshly registered version and, when it was activated, how loading it
/// went.
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub version: ModelVersion,
    pub load: Option<LoadOutcome>,
}

pub struct ModelRegistry {
    store: Box<dyn VersionStore>,
    models_dir: PathBuf,
    catalog: Mutex<()>,
    active: RwLock<Option<Arc<LoadedModel>>>,
}

impl ModelRegistry {
    /// Registry over `store`, placing new artifacts under `models_dir`.
    /// Starts unloaded; call [`Self::load_active`] to serve the catalog's
    /// active version.
    pub fn new(store: impl VersionStore + 'static, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: Box::new(store),
            models_dir: models_dir.into(),
            catalog: Mutex::new(()),
            active: RwLock::new(None),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Where the artifact for `label` of `kind` is written.
    pub fn artifact_path(&self, kind: BackendKind, label: &str) -> PathBuf {
        self.models_dir
            .join(format!("{}_{label}.json", kind.artifact_prefix()))
    }

    /// A fresh sibling of [`Self::artifact_path`] to write into before
    /// [`Self::register_staged`] moves it into place.
    pub fn staging_path(&self, kind: BackendKind, label: &str) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.models_dir.join(format!(
            ".{}_{label}.{}-{seq}.partial",
            kind.artifact_prefix(),
            std::process::id()
        ))
    }

    // -- Queries --

    pub fn versions(&self) -> Result<Vec<ModelVersion>> {
        self.store.load()
    }

    /// The version the catalog flags active (which may differ from the
    /// served one if its artifact failed to load).
    pub fn active_version(&self) -> Result<Option<ModelVersion>> {
        Ok(self.store.load()?.into_iter().find(|v| v.is_active))
    }

    /// Look a version up by numeric id or by label.
    pub fn find(&self, key: &str) -> Result<ModelVersion> {
        let versions = self.store.load()?;
        let id = key.parse::<u64>().ok();
        versions
            .iter()
            .find(|v| v.version_label == key)
            .or_else(|| id.and_then(|id| versions.iter().find(|v| v.id == id)))
            .cloned()
            .ok_or_else(|| Error::VersionNotFound(key.to_string()))
    }

    pub fn contains_label(&self, label: &str) -> Result<bool> {
        Ok(self.store.load()?.iter().any(|v| v.version_label == label))
    }

    /// The model currently serving predictions, if any.
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // -- Prediction --

    /// Score with the current model; `Unknown` with confidence 0 when none
    /// is loaded.
    pub fn predict(&self, x: &[f64], y: &[f64]) -> DiagnosticPrediction {
        match self.current() {
            Some(loaded) => loaded.model.predict(x, y),
            None => DiagnosticPrediction::unknown(),
        }
    }

    // -- Lifecycle --

    /// Load the catalog's active version and publish it.
    pub fn load_active(&self) -> LoadOutcome {
        let _guard = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        match self.store.load() {
            Ok(versions) => self.load_active_from(&versions),
            Err(e) => {
                log::error!("Could not read model catalog: {e}");
                LoadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Flag `id` as the only active version, persist, then reload.
    pub fn activate(&self, id: u64) -> Result<LoadOutcome> {
        let _guard = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        let mut versions = self.store.load()?;
        if !versions.iter().any(|v| v.id == id) {
            return Err(Error::VersionNotFound(id.to_string()));
        }
        for v in &mut versions {
            v.is_active = v.id == id;
        }
        self.store.save(&versions)?;
        log::info!("Activated model version id {id}");
        Ok(self.load_active_from(&versions))
    }

    /// Add a version to the catalog. With `activate`, every other version is
    /// deactivated and the new one is loaded immediately; a failed load is
    /// logged and the previous model keeps serving.
    pub fn register(&self, new: NewVersion, activate: bool) -> Result<ModelVersion> {
        let _guard = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        let mut versions = self.store.load()?;
        self.check_new_label(&versions, &new.version_label)?;
        self.insert(&mut versions, new, activate)
            .map(|registered| registered.version)
    }

    /// Like [`Self::register`], for an artifact written to `staged` (see
    /// [`Self::staging_path`]). The label check and the move to
    /// `new.artifact_path` happen under the catalog lock, so a rejected
    /// version never touches an existing artifact. `staged` is removed on
    /// failure.
    pub fn register_staged(&self, new: NewVersion, staged: &Path, activate: bool) -> Result<Registered> {
        let _guard = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        let publish = |versions: &mut Vec<ModelVersion>| -> Result<()> {
            *versions = self.store.load()?;
            self.check_new_label(versions, &new.version_label)?;
            fs::rename(staged, &new.artifact_path)?;
            Ok(())
        };
        let mut versions = Vec::new();
        if let Err(e) = publish(&mut versions) {
            if let Err(rm) = fs::remove_file(staged) {
                log::warn!("Could not remove staged artifact '{}': {rm}", staged.display());
            }
            return Err(e);
        }
        self.insert(&mut versions, new, activate)
    }

    fn check_new_label(&self, versions: &[ModelVersion], label: &str) -> Result<()> {
        validate_label(label)?;
        if versions.iter().any(|v| v.version_label == label) {
            return Err(Error::DuplicateVersion(label.to_string()));
        }
        Ok(())
    }

    /// Caller holds the catalog lock and has checked the label.
    fn insert(&self, versions: &mut Vec<ModelVersion>, new: NewVersion, activate: bool) -> Result<Registered> {
        let id = versions.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        let version = ModelVersion {
            id,
            version_label: new.version_label,
            artifact_path: new.artifact_path,
            backend_kind: new.backend_kind,
            accuracy: new.accuracy,
            metrics: new.metrics,
            is_active: activate,
            input_length: new.input_length,
            description: new.description,
            created_at: Utc::now(),
        };
        if activate {
            versions.iter_mut().for_each(|v| v.is_active = false);
        }
        versions.push(version.clone());
        self.store.save(versions)?;
        log::info!(
            "Registered {:?} model version '{}' (id {id})",
            version.backend_kind,
            version.version_label
        );
        let load = activate.then(|| self.load_active_from(versions));
        if let Some(LoadOutcome::Failed { reason }) = &load {
            log::warn!(
                "Version '{}' is flagged active but not serving: {reason}",
                version.version_label
            );
        }
        Ok(Registered { version, load })
    }

    /// Caller holds the catalog lock.
    fn load_active_from(&self, versions: &[ModelVersion]) -> LoadOutcome {
        let Some(version) = versions.iter().find(|v| v.is_active) else {
            log::info!("No active model version; serving without a model");
            *self.active.write().unwrap_or_else(PoisonError::into_inner) = None;
            return LoadOutcome::NoActiveVersion;
        };

        match load_model(&version.artifact_path, version.backend_kind) {
            Ok(model) => {
                let loaded = Arc::new(LoadedModel {
                    version: version.clone(),
                    model,
                });
                *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded);
                log::info!(
                    "Serving model version '{}' ({:?})",
                    version.version_label,
                    version.backend_kind
                );
                LoadOutcome::Loaded {
                    version_label: version.version_label.clone(),
                }
            }
            Err(e) => {
                let kept = self
                    .current()
                    .map(|m| m.version.version_label.clone())
                    .unwrap_or_else(|| "none".into());
                log::error!(
                    "Failed to load model version '{}': {e}; keeping previous model ({kept})",
                    version.version_label
                );
                LoadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::forest::{ForestParams, RandomForest};
    use crate::inference::artifact::save_classical;
    use crate::inference::{ClassicalArtifact, Diagnosis};
    use crate::preprocess::PreprocessingConfig;

    fn write_classical(path: &Path) {
        let rows = vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![1.0, 1.0], vec![0.9, 1.0]];
        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&rows, &[0, 0, 1, 1], &params).unwrap();
        save_classical(
            path,
            &ClassicalArtifact {
                forest,
                preprocessing: PreprocessingConfig::default(),
                grid: None,
            },
        )
        .unwrap();
    }

    fn new_version(registry: &ModelRegistry, label: &str) -> NewVersion {
        NewVersion {
            version_label: label.into(),
            artifact_path: registry.artifact_path(BackendKind::Classical, label),
            backend_kind: BackendKind::Classical,
            accuracy: Some(1.0),
            metrics: BTreeMap::new(),
            input_length: None,
            description: String::new(),
        }
    }

    #[test]
    fn empty_registry_predicts_unknown() {
        let registry = ModelRegistry::new(MemoryStore::new(), "unused");
        assert_eq!(registry.load_active(), LoadOutcome::NoActiveVersion);
        let p = registry.predict(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(p, DiagnosticPrediction::unknown());
    }

    #[test]
    fn register_assigns_ids_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(MemoryStore::new(), dir.path());
        let v1 = new_version(&registry, "v1");
        write_classical(&v1.artifact_path);
        assert_eq!(registry.register(v1.clone(), true).unwrap().id, 1);
        assert!(matches!(
            registry.register(v1, false),
            Err(Error::DuplicateVersion(label)) if label == "v1"
        ));
        assert_eq!(registry.find("1").unwrap().version_label, "v1");
        assert_eq!(registry.find("v1").unwrap().id, 1);
        assert!(matches!(registry.find("v9"), Err(Error::VersionNotFound(_))));

        let served = registry.current().unwrap();
        assert_eq!(served.version.version_label, "v1");
        assert_ne!(registry.predict(&[], &[1.0; 2]).diagnosis, Diagnosis::Unknown);
    }

    #[test]
    fn activating_unknown_id_fails() {
        let registry = ModelRegistry::new(MemoryStore::new(), "unused");
        assert!(matches!(registry.activate(4), Err(Error::VersionNotFound(_))));
    }

    #[test]
    fn artifact_paths_follow_kind_prefix() {
        let registry = ModelRegistry::new(MemoryStore::new(), "models_storage");
        assert_eq!(
            registry.artifact_path(BackendKind::Neural, "v2"),
            PathBuf::from("models_storage/cnn_v2.json")
        );
    }
}
