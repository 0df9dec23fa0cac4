#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use raman_dx::data::{Spectrum, TrainingSample};
use raman_dx::forest::{ForestParams, RandomForest};
use raman_dx::inference::artifact::save_classical;
use raman_dx::inference::ClassicalArtifact;
use raman_dx::registry::{ModelRegistry, NewVersion};
use raman_dx::{BackendKind, PreprocessingConfig};

pub const POINTS: usize = 200;

pub fn axis() -> Vec<f64> {
    (0..POINTS).map(|i| 400.0 + 9.0 * i as f64).collect()
}

/// Sloped background with one dominant peak whose position encodes the
/// class, plus a deterministic wobble so samples differ.
pub fn spectrum(malignant: bool, variant: usize) -> Spectrum {
    let x = axis();
    let center = if malignant { 60.0 } else { 140.0 };
    let y = (0..POINTS)
        .map(|i| {
            let t = i as f64;
            let peak = (-(t - center).powi(2) / 18.0).exp();
            0.3 + 0.001 * t + (1.0 + 0.05 * variant as f64) * peak + 0.01 * ((t + variant as f64) * 0.7).sin()
        })
        .collect();
    Spectrum::new(x, y).unwrap()
}

pub fn samples(n: usize) -> Vec<TrainingSample> {
    (0..n)
        .map(|i| {
            let malignant = i % 2 == 1;
            let aux = if i % 3 == 0 { [-1; 4] } else { [i8::from(malignant), 0, -1, 1] };
            TrainingSample::new(spectrum(malignant, i), u8::from(malignant)).with_aux_labels(aux)
        })
        .collect()
}

/// Points of the 400–2200 cm⁻¹ axis at unit spacing.
pub fn canonical_axis() -> Vec<f64> {
    (0..1801).map(|i| 400.0 + f64::from(i)).collect()
}

/// Broad band at 900 cm⁻¹ (malignant) or 1500 cm⁻¹ (benign) on a sloped
/// background, placed by wavenumber so any sampling of the axis agrees.
pub fn band_spectrum(x: &[f64], malignant: bool, variant: usize) -> Spectrum {
    let center = if malignant { 900.0 } else { 1500.0 } + (variant % 5) as f64 - 2.0;
    let y = x
        .iter()
        .map(|&w| {
            let band = (-(w - center).powi(2) / (2.0 * 40.0 * 40.0)).exp();
            0.2 + 1e-4 * (w - 400.0) + band + 0.01 * (0.05 * w + variant as f64).sin()
        })
        .collect();
    Spectrum::new(x.to_vec(), y).unwrap()
}

pub fn canonical_samples(n: usize) -> Vec<TrainingSample> {
    let x = canonical_axis();
    (0..n)
        .map(|i| {
            let malignant = i % 2 == 1;
            TrainingSample::new(band_spectrum(&x, malignant, i), u8::from(malignant))
        })
        .collect()
}

/// Write a small classical artifact and return the version to register.
pub fn classical_version(registry: &ModelRegistry, label: &str) -> NewVersion {
    let path = registry.artifact_path(BackendKind::Classical, label);
    write_forest(&path);
    NewVersion {
        version_label: label.to_string(),
        artifact_path: path,
        backend_kind: BackendKind::Classical,
        accuracy: Some(1.0),
        metrics: BTreeMap::new(),
        input_length: None,
        description: format!("fixture {label}"),
    }
}

pub fn write_forest(path: &Path) {
    let rows: Vec<Vec<f64>> = (0..10)
        .map(|i| {
            let level = if i < 5 { 0.0 } else { 1.0 };
            vec![level; 4]
        })
        .collect();
    let labels: Vec<u8> = (0..10).map(|i| u8::from(i >= 5)).collect();
    let params = ForestParams {
        n_estimators: 5,
        ..ForestParams::default()
    };
    let forest = RandomForest::fit(&rows, &labels, &params).unwrap();
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
