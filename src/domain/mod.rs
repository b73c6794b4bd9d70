// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define what the
// pipeline works with. No burn types, no file I/O.

/// Pipeline error type and Result alias
pub mod error;

/// Immutable timestamped interaction sets
pub mod interaction;

/// Dense node/edge feature matrices
pub mod features;

/// The configured learning task
pub mod task;

/// Evaluator abstraction
pub mod traits;
