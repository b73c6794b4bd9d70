// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything between raw files and model-ready samples.
//
//   ml_<dataset>.csv
//       │
//       ▼
//   TemporalDataset   → edge index + timestamps (+ labels)
//       │
//       ▼
//   Splitter          → train / valid / test by time quantiles
//       │
//       ▼
//   NegativeSampler   → corrupted edges for link prediction
//
//   frame series ──▶ Preprocessor → sliding input/output windows
//
// Each module does one step and is tested on its own.

/// Loads interaction CSVs into a TemporalDataset
pub mod loader;

/// Splits a dataset by timestamp quantiles
pub mod splitter;

/// Sliding input/output windows over a frame series
pub mod preprocessor;

/// Uniform negative destination sampling
pub mod sampler;
