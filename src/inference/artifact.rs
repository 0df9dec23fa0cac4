//! Artifact files: one JSON document per model version, decoded according
//! to the version's stored [`BackendKind`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

use super::classical::{ClassicalArtifact, ClassicalBackend};
use super::neural::{NeuralBackend, NeuralCheckpoint};
use super::{BackendKind, DiagnosticModel};

/// Write `value` as JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            Error::ModelUnavailable(format!("artifact '{}' does not exist", path.display()))
        }
        _ => Error::Io(e),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn save_classical(path: &Path, artifact: &ClassicalArtifact) -> Result<()> {
    write_json(path, artifact)
}

pub fn save_neural(path: &Path, checkpoint: &NeuralCheckpoint) -> Result<()> {
    write_json(path, checkpoint)
}

/// Build a model from `path`, decoding it as `kind`.
pub fn load_model(path: &Path, kind: BackendKind) -> Result<DiagnosticModel> {
    match kind {
        BackendKind::Classical => {
            let artifact: ClassicalArtifact = read_json(path)?;
            Ok(DiagnosticModel::Classical(ClassicalBackend::new(artifact)))
        }
        BackendKind::Neural => {
            let checkpoint: NeuralCheckpoint = read_json(path)?;
            NeuralBackend::new(checkpoint)
                .map(DiagnosticModel::Neural)
                .map_err(|reason| Error::ArtifactCorrupt {
                    path: path.to_path_buf(),
                    reason,
                })
        }
    }
}
