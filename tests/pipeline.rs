mod common;

use raman_dx::preprocess::{normalize_minmax, process};
use raman_dx::reconcile::{FeatureReconciler, WavenumberGrid};
use raman_dx::{preprocess, Error, PreprocessingConfig};

use common::{axis, spectrum};

#[test]
fn partial_json_config_fills_defaults() {
    let cfg: PreprocessingConfig =
        serde_json::from_str(r#"{"baseline_method": "als", "normalize_method": "snv"}"#).unwrap();
    assert!(cfg.smooth && cfg.baseline && cfg.normalize);
    let x = axis();
    let y = spectrum(true, 0).y().to_vec();

    let out = preprocess(&x, &y, &cfg).unwrap();
    assert_eq!(out.len(), y.len());
    let mean = out.iter().sum::<f64>() / out.len() as f64;
    assert!(mean.abs() < 1e-9);
    assert_eq!(out, preprocess(&x, &y, &cfg).unwrap());
}

#[test]
fn spike_scenario_spans_unit_interval() {
    let y = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 4.0, 3.0, 2.0, 1.0];
    let x: Vec<f64> = (0..10).map(f64::from).collect();
    let cfg = PreprocessingConfig {
        baseline: false,
        ..PreprocessingConfig::default()
    };
    let out = preprocess(&x, &y, &cfg).unwrap();
    let max = out.iter().cloned().fold(f64::MIN, f64::max);
    let min = out.iter().cloned().fold(f64::MAX, f64::min);
    assert_eq!(max, 1.0);
    assert_eq!(min, 0.0);
}

#[test]
fn constant_signal_normalizes_to_zeros() {
    assert_eq!(normalize_minmax(&[3.0; 6]), vec![0.0; 6]);
}

#[test]
fn invalid_arrays_are_rejected() {
    let err = preprocess(&[1.0, 2.0], &[1.0], &PreprocessingConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidSpectrum(_)));
}

#[test]
fn processed_spectrum_reconciles_to_canonical_grid() {
    let s = spectrum(false, 3);
    let processed = process(&s, &PreprocessingConfig::default());
    let reconciler = FeatureReconciler::for_model(1801, Some(WavenumberGrid::CANONICAL));
    let features = reconciler.reconcile(s.x(), &processed).unwrap();
    assert_eq!(features.len(), 1801);
    // identity when the length already matches
    assert_eq!(reconciler.reconcile(&[], &features).unwrap(), features);
}

#[test]
fn derivative_stage_agrees_on_uniform_and_uneven_axes() {
    let cfg = PreprocessingConfig {
        smooth: false,
        baseline: false,
        normalize: false,
        derivative_order: raman_dx::preprocess::DerivativeOrder::First,
        ..PreprocessingConfig::default()
    };
    // y = x² sampled on an even and on a jittered 400..=500 axis.
    let even: Vec<f64> = (0..=50).map(|i| 400.0 + 2.0 * f64::from(i)).collect();
    let uneven: Vec<f64> = (0..=50)
        .map(|i| 400.0 + 2.0 * f64::from(i) + if i % 2 == 1 { 0.6 } else { 0.0 })
        .collect();
    for x in [&even, &uneven] {
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let d = preprocess(x, &y, &cfg).unwrap();
        for i in 1..x.len() - 1 {
            assert!((d[i] - 2.0 * x[i]).abs() < 1e-6, "x={} d={}", x[i], d[i]);
        }
    }
}
