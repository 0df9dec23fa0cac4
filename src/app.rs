//! Command dispatch for the `raman-dx` binary.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::cli::{ActivateArgs, Cli, Command, PredictArgs, PreprocessArgs, TrainArgs};
use crate::data::filter::{parse_filters, training_indices};
use crate::data::loader::{load_file, load_spectrum};
use crate::data::sample::build_training_samples;
use crate::preprocess::{process, PreprocessingConfig};
use crate::registry::{LoadOutcome, ModelRegistry};
use crate::settings::Settings;
use crate::training::{train, TrainingOptions};

pub fn run() -> Result<()> {
    dispatch(Cli::parse())
}

/// Parse `args` (program name first) and dispatch; parse errors are
/// returned instead of exiting the process.
pub fn run_from<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    dispatch(Cli::try_parse_from(args)?)
}

fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().with_overrides(cli.models_dir, cli.registry);

    match cli.command {
        Command::Preprocess(args) => handle_preprocess(args),
        Command::Predict(args) => handle_predict(args, &settings.open_registry()),
        Command::Train(args) => handle_train(args, &settings.open_registry()),
        Command::Versions => handle_versions(&settings.open_registry()),
        Command::Activate(args) => handle_activate(args, &settings.open_registry()),
    }
}

fn read_config(path: Option<&Path>) -> Result<PreprocessingConfig> {
    let Some(path) = path else {
        return Ok(PreprocessingConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn handle_preprocess(args: PreprocessArgs) -> Result<()> {
    let config = read_config(args.config.as_deref())?;
    let spectrum = load_spectrum(&args.input)?;
    let processed = process(&spectrum, &config);
    println!("{}", serde_json::to_string(&processed)?);
    Ok(())
}

fn handle_predict(args: PredictArgs, registry: &ModelRegistry) -> Result<()> {
    if let LoadOutcome::Failed { reason } = registry.load_active() {
        log::warn!("Predicting without a model: {reason}");
    }
    let spectrum = load_spectrum(&args.input)?;
    let prediction = registry.predict(spectrum.x(), spectrum.y());
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

fn handle_train(args: TrainArgs, registry: &ModelRegistry) -> Result<()> {
    let dataset = load_file(&args.dataset)?;
    let filters = parse_filters(&args.filters)?;
    let indices = training_indices(&dataset, &filters);
    let samples = build_training_samples(&dataset, &indices);
    log::info!(
        "{} of {} records selected, {} labeled",
        indices.len(),
        dataset.len(),
        samples.len()
    );

    let defaults = TrainingOptions::default();
    let options = TrainingOptions {
        version_label: args.label,
        description: args.description,
        preprocessing: read_config(args.config.as_deref())?,
        epochs: args.epochs.unwrap_or(defaults.epochs),
        ..defaults
    };
    let outcome = train(&samples, args.backend, &options, registry, &AtomicBool::new(false));
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        bail!("Training did not produce a model");
    }
    Ok(())
}

fn handle_versions(registry: &ModelRegistry) -> Result<()> {
    let versions = registry.versions()?;
    if versions.is_empty() {
        println!("No model versions registered.");
        return Ok(());
    }
    println!(
        "{:>4}  {:1}  {:<16} {:<10} {:>8}  {}",
        "id", "", "label", "backend", "accuracy", "created"
    );
    for v in versions {
        let accuracy = v.accuracy.map_or_else(|| "-".to_string(), |a| format!("{a:.4}"));
        println!(
            "{:>4}  {:1}  {:<16} {:<10} {:>8}  {}",
            v.id,
            if v.is_active { "*" } else { "" },
            v.version_label,
            format!("{:?}", v.backend_kind).to_lowercase(),
            accuracy,
            v.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn handle_activate(args: ActivateArgs, registry: &ModelRegistry) -> Result<()> {
    let version = registry.find(&args.target)?;
    match registry.activate(version.id)? {
        LoadOutcome::Loaded { version_label } => println!("Active model: {version_label}"),
        LoadOutcome::Failed { reason } => {
            bail!("Version '{}' is flagged active but failed to load: {reason}", version.version_label)
        }
        LoadOutcome::NoActiveVersion => bail!("No version became active"),
    }
    Ok(())
}
