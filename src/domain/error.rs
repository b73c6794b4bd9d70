// ============================================================
// Layer 3: Pipeline Errors
// ============================================================
// Every fallible operation in the data, ml and infra layers
// returns this error type. The variants follow the three kinds
// of failure the pipeline knows about:
//
//   InvalidInput    → malformed arrays, out-of-range ratios or windows
//   NotFound        → unknown name in a registry lookup
//   NotImplemented  → a naming-rule pair that has no conversion
//
// Wrapped library errors (I/O, CSV, JSON, tensors) are kept
// as their own variants so callers can still match on them.
// Nothing here is retried; errors go straight to the caller.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{kind} \"{name}\" is not found")]
    NotFound { kind: &'static str, name: String },

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tensor error: {0}")]
    Tensor(String),

    #[error("logger setup failed: {0}")]
    Logger(String),
}

impl PipelineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound { kind, name: name.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_kind() {
        let err = PipelineError::not_found("evaluator", "FooEvaluator");
        assert_eq!(err.to_string(), "evaluator \"FooEvaluator\" is not found");
    }
}
