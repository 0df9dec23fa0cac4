/// Data layer: spectra, stored records, labels and record selection.
///
/// Architecture:
/// ```text
///  .json / .csv records
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SpectralDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  metadata predicates + training flag → indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  sample   │  labels parsed per record → Vec<TrainingSample>
///   └──────────┘
/// ```
pub mod filter;
pub mod labels;
pub mod loader;
pub mod model;
pub mod sample;

pub use model::{MetadataValue, RawSpectrum, SpectralDataset, Spectrum, SpectrumRecord};
pub use sample::{AuxMarker, TrainingSample};
