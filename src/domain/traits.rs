// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The evaluator abstraction lives here because it only deals
// in plain numbers: labels and scores in, named metrics out.
// The executor abstraction needs tensors, so it lives in the
// ml layer next to the model it drives.
//
// Implementations are created by name through the evaluator
// registry (ml::evaluator::get_evaluator).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::error::Result;

/// Metric name → value, sorted by name so saved results are stable.
pub type EvalReport = BTreeMap<String, f64>;

// ─── Evaluator ────────────────────────────────────────────────────────────────
/// Accumulates predictions and turns them into metrics.
///
/// Implementations:
///   - LinkPredictionEvaluator     → accuracy, average precision, ROC-AUC
///   - NodeClassificationEvaluator → accuracy, ROC-AUC
pub trait Evaluator {
    /// Registry name of this evaluator.
    fn name(&self) -> &'static str;

    /// Add one batch of binary labels and predicted probabilities.
    fn collect(&mut self, y_true: &[f32], y_score: &[f32]) -> Result<()>;

    /// Compute every metric over everything collected so far.
    fn evaluate(&self) -> Result<EvalReport>;

    /// Evaluate and write the report as JSON into `dir`.
    /// Returns the path of the written file.
    fn save_result(&self, dir: &Path, filename: Option<&str>) -> Result<PathBuf>;

    /// Drop everything collected so far.
    fn clear(&mut self);
}
