//! Signal conditioning.
//!
//! `smooth`, `baseline`, `derivative` and `normalize` are stateless numeric
//! primitives; `pipeline` orders them per a [`PreprocessingConfig`].

pub mod baseline;
pub mod config;
pub mod derivative;
pub mod normalize;
pub mod pipeline;
pub mod smooth;

pub use baseline::{als_baseline, baseline_als, baseline_poly};
pub use config::{BaselineMethod, DerivativeOrder, NormalizeMethod, PreprocessingConfig};
pub use derivative::{derivative, gradient};
pub use normalize::{normalize_minmax, normalize_snv};
pub use pipeline::{preprocess, process};
pub use smooth::{savgol, smooth};
