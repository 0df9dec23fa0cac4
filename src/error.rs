use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error – failures the core reports to its callers
// ---------------------------------------------------------------------------

/// Errors surfaced by the library.
///
/// Numeric trouble inside individual signal operations (oversized smoothing
/// window, degenerate polynomial fit, ...) never shows up here: those stages
/// log a warning and pass their input through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The wavenumber/intensity pair cannot form a spectrum.
    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(String),

    /// Resampling to the model's input length was impossible.
    #[error("cannot reconcile {actual} features to {expected}: {reason}")]
    FeatureMismatch {
        expected: usize,
        actual: usize,
        reason: String,
    },

    /// No model is loaded, or its artifact is missing.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Too few labeled samples to train and evaluate.
    #[error("insufficient training data: {0}")]
    TrainingDataInsufficient(String),

    /// The artifact exists but cannot be decoded or does not fit its kind.
    #[error("artifact '{}' is corrupt: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("model version not found: {0}")]
    VersionNotFound(String),

    #[error("model version label already exists: {0}")]
    DuplicateVersion(String),

    /// Options that cannot produce a working model (e.g. a network input
    /// too short to survive downsampling).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Training stopped on the cooperative cancellation flag.
    #[error("training cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
