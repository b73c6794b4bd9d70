// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Cross-cutting helpers used by every other layer:
//
//   config.rs     : PipelineConfig
//                   A JSON object of run parameters with typed
//                   getters and defaults.
//
//   registry.rs   : Name → constructor tables
//                   Backing store for the model, executor and
//                   evaluator factories.
//
//   logger.rs     : Run logger
//                   tracing subscriber writing to a per-run
//                   log file and to stdout.
//
//   seed.rs       : Seeding of the host and backend RNGs
//
//   naming.rs     : Identifier naming-rule conversion
//
//   checkpoint.rs : Saving and loading model weights
//                   Uses Burn's CompactRecorder for parameters
//                   and JSON for model hyperparameters.

/// JSON-backed run configuration
pub mod config;

/// Generic name → constructor registry
pub mod registry;

/// File + stdout logger
pub mod logger;

/// Random seed control
pub mod seed;

/// Naming-rule conversion
pub mod naming;

/// Model checkpoint saving and loading
pub mod checkpoint;
