use crate::data::Spectrum;
use crate::error::Result;

use super::baseline::{
    baseline_als, baseline_poly, DEFAULT_ALS_ITERATIONS, DEFAULT_ALS_LAMBDA, DEFAULT_ALS_P,
    DEFAULT_POLY_DEGREE,
};
use super::config::{BaselineMethod, DerivativeOrder, NormalizeMethod, PreprocessingConfig};
use super::derivative::derivative;
use super::normalize::{normalize_minmax, normalize_snv};
use super::smooth::smooth;

/// Condition a spectrum.
///
/// Stage order is fixed: smooth → baseline → derivative → normalize, each
/// stage gated by `config`. Training and inference both go through here, so
/// this order is part of every model's contract. Pure and deterministic.
pub fn process(spectrum: &Spectrum, config: &PreprocessingConfig) -> Vec<f64> {
    let x = spectrum.x();
    let mut y = spectrum.y().to_vec();

    if config.smooth {
        y = smooth(&y);
    }

    if config.baseline {
        y = match config.baseline_method {
            BaselineMethod::Poly => baseline_poly(x, &y, DEFAULT_POLY_DEGREE),
            BaselineMethod::Als => {
                baseline_als(&y, DEFAULT_ALS_LAMBDA, DEFAULT_ALS_P, DEFAULT_ALS_ITERATIONS)
            }
        };
    }

    if config.derivative_order != DerivativeOrder::None {
        y = derivative(x, &y, config.derivative_order);
    }

    if config.normalize {
        y = match config.normalize_method {
            NormalizeMethod::Minmax => normalize_minmax(&y),
            NormalizeMethod::Snv => normalize_snv(&y),
        };
    }

    y
}

/// Validate raw arrays and run [`process`].
pub fn preprocess(x: &[f64], y: &[f64], config: &PreprocessingConfig) -> Result<Vec<f64>> {
    let spectrum = Spectrum::new(x.to_vec(), y.to_vec())?;
    Ok(process(&spectrum, config))
}
