//! Command-line parsing. Dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::inference::BackendKind;

#[derive(Debug, Parser)]
#[command(
    name = "raman-dx",
    version,
    about = "Raman spectrum conditioning, diagnosis and model versioning"
)]
pub struct Cli {
    /// Directory holding model artifacts (overrides RAMAN_MODELS_DIR).
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    /// Version catalog file (overrides RAMAN_REGISTRY_PATH).
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Condition one spectrum and print the processed intensities.
    Preprocess(PreprocessArgs),
    /// Diagnose one spectrum with the active model.
    Predict(PredictArgs),
    /// Train a new model version from a records file and activate it.
    Train(TrainArgs),
    /// List the version catalog.
    Versions,
    /// Make a version (by id or label) the active one.
    Activate(ActivateArgs),
}

#[derive(Debug, Args)]
pub struct PreprocessArgs {
    /// Spectrum file (JSON `{"x": [...], "y": [...]}` or CSV).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Preprocessing config JSON; missing fields take their defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[arg(short, long)]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct TrainArgs {
    /// Records file (.json or .csv).
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// classical or neural.
    #[arg(short, long, default_value = "classical")]
    pub backend: BackendKind,

    /// Version label; defaults to v{YYYYMMDDHHMM}.
    #[arg(short, long)]
    pub label: Option<String>,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Neural training epochs.
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Preprocessing config JSON used for training and stored with the model.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only use records where column=value (repeatable).
    #[arg(long = "where", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ActivateArgs {
    /// Numeric id or version label.
    #[arg(value_name = "VERSION")]
    pub target: String,
}
