use serde::{Deserialize, Serialize};

/// Baseline removal strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineMethod {
    /// Least-squares polynomial fit on the wavenumber axis.
    #[default]
    Poly,
    /// Asymmetric least squares.
    Als,
}

/// Normalization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMethod {
    #[default]
    Minmax,
    /// Standard normal variate (per-spectrum z-score).
    Snv,
}

/// Derivative applied after baseline removal; serialised as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DerivativeOrder {
    #[default]
    None,
    First,
    Second,
}

impl DerivativeOrder {
    pub fn as_u8(self) -> u8 {
        match self {
            DerivativeOrder::None => 0,
            DerivativeOrder::First => 1,
            DerivativeOrder::Second => 2,
        }
    }
}

impl TryFrom<u8> for DerivativeOrder {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(DerivativeOrder::None),
            1 => Ok(DerivativeOrder::First),
            2 => Ok(DerivativeOrder::Second),
            other => Err(format!("derivative order must be 0, 1 or 2, got {other}")),
        }
    }
}

impl From<DerivativeOrder> for u8 {
    fn from(v: DerivativeOrder) -> u8 {
        v.as_u8()
    }
}

/// Which conditioning stages run, and how.
///
/// Training stores the config it used inside the model artifact; inference
/// replays exactly that config. Missing JSON fields take the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub smooth: bool,
    pub baseline: bool,
    pub baseline_method: BaselineMethod,
    #[serde(alias = "derivative")]
    pub derivative_order: DerivativeOrder,
    pub normalize: bool,
    pub normalize_method: NormalizeMethod,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            smooth: true,
            baseline: true,
            baseline_method: BaselineMethod::Poly,
            derivative_order: DerivativeOrder::None,
            normalize: true,
            normalize_method: NormalizeMethod::Minmax,
        }
    }
}
