//! Process settings: where artifacts and the version catalog live.
//!
//! Resolved from the environment (after loading a `.env` file, if any);
//! command-line flags override both.

use std::path::PathBuf;

use crate::registry::{JsonFileStore, ModelRegistry};

pub const MODELS_DIR_ENV: &str = "RAMAN_MODELS_DIR";
pub const REGISTRY_PATH_ENV: &str = "RAMAN_REGISTRY_PATH";
pub const DEFAULT_MODELS_DIR: &str = "models_storage";
const REGISTRY_FILE: &str = "registry.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub models_dir: PathBuf,
    /// Explicit catalog location; `None` means `<models_dir>/registry.json`.
    pub registry_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            registry_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key| lookup(key).filter(|v: &String| !v.trim().is_empty());
        Self {
            models_dir: non_empty(MODELS_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR)),
            registry_path: non_empty(REGISTRY_PATH_ENV).map(PathBuf::from),
        }
    }

    pub fn with_overrides(mut self, models_dir: Option<PathBuf>, registry_path: Option<PathBuf>) -> Self {
        if let Some(dir) = models_dir {
            self.models_dir = dir;
        }
        if registry_path.is_some() {
            self.registry_path = registry_path;
        }
        self
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(|| self.models_dir.join(REGISTRY_FILE))
    }

    /// Registry backed by the JSON catalog file. Not yet loaded.
    pub fn open_registry(&self) -> ModelRegistry {
        ModelRegistry::new(JsonFileStore::new(self.registry_path()), &self.models_dir)
    }
}
