//! Raman spectrum diagnostics: signal conditioning, feature reconciliation,
//! classical and neural diagnostic models, and a versioned model registry.

pub mod app;
pub mod cli;
pub mod data;
pub mod error;
pub mod forest;
pub mod inference;
pub mod math;
pub mod nn;
pub mod preprocess;
pub mod reconcile;
pub mod registry;
pub mod settings;
pub mod training;

pub use error::{Error, Result};
pub use inference::{BackendKind, Diagnosis, DiagnosticModel, DiagnosticPrediction};
pub use preprocess::{preprocess, PreprocessingConfig};
pub use reconcile::FeatureReconciler;
pub use registry::ModelRegistry;
pub use training::{train, TrainingOptions, TrainingOutcome};
