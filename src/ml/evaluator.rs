// ============================================================
// Layer 5: Evaluators
// ============================================================
// Evaluators collect binary labels and predicted probabilities
// batch by batch and summarise them as named metrics:
//
//   accuracy           → share of predictions on the right side
//                        of 0.5
//   average_precision  → area under the precision/recall curve,
//                        summed over distinct score thresholds
//   roc_auc            → probability that a random positive is
//                        scored above a random negative (ties
//                        count half)
//
// Results are written as JSON named
//   {local time}_{model}_{dataset}.json
// unless the caller passes a file name.
//
// Evaluators are created by name from the `evaluator` config
// key through the evaluator registry.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::{PipelineError, Result};
use crate::domain::traits::{EvalReport, Evaluator};
use crate::infra::config::PipelineConfig;
use crate::infra::logger::{ensure_dir, get_local_time};
use crate::infra::registry::Registry;

// ─── Metrics ──────────────────────────────────────────────────────────────────

fn is_positive(label: f32) -> bool {
    label >= 0.5
}

pub fn accuracy(y_true: &[f32], y_score: &[f32]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_score)
        .filter(|&(&t, &s)| is_positive(t) == (s > 0.5))
        .count();
    correct as f64 / y_true.len() as f64
}

/// Indices of `y_score` sorted by descending score.
fn ranked(y_score: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));
    order
}

fn class_counts(y_true: &[f32]) -> (usize, usize) {
    let pos = y_true.iter().filter(|&&t| is_positive(t)).count();
    (pos, y_true.len() - pos)
}

pub fn average_precision(y_true: &[f32], y_score: &[f32]) -> Result<f64> {
    let (pos, _) = class_counts(y_true);
    if pos == 0 {
        return Err(PipelineError::invalid("average precision needs at least one positive"));
    }

    let order = ranked(y_score);
    let (mut tp, mut fp) = (0usize, 0usize);
    let (mut ap, mut prev_recall) = (0.0f64, 0.0f64);

    let mut i = 0;
    while i < order.len() {
        // consume every sample sharing this threshold
        let threshold = y_score[order[i]];
        while i < order.len() && y_score[order[i]] == threshold {
            if is_positive(y_true[order[i]]) { tp += 1 } else { fp += 1 }
            i += 1;
        }
        let recall    = tp as f64 / pos as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    Ok(ap)
}

pub fn roc_auc(y_true: &[f32], y_score: &[f32]) -> Result<f64> {
    let (pos, neg) = class_counts(y_true);
    if pos == 0 || neg == 0 {
        return Err(PipelineError::invalid(
            "ROC-AUC is undefined unless both classes are present",
        ));
    }

    // ascending ranks, ties get their average rank
    let mut order = ranked(y_score);
    order.reverse();
    let mut ranks = vec![0.0f64; order.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = (0..y_true.len())
        .filter(|&k| is_positive(y_true[k]))
        .map(|k| ranks[k])
        .sum();
    let pos = pos as f64;
    Ok((pos_rank_sum - pos * (pos + 1.0) / 2.0) / (pos * neg as f64))
}

// ─── Shared State ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct ScoreBuffer {
    y_true:  Vec<f32>,
    y_score: Vec<f32>,
}

impl ScoreBuffer {
    fn push(&mut self, y_true: &[f32], y_score: &[f32]) -> Result<()> {
        if y_true.len() != y_score.len() {
            return Err(PipelineError::invalid(format!(
                "{} labels but {} scores",
                y_true.len(),
                y_score.len()
            )));
        }
        if y_score.iter().chain(y_true).any(|v| v.is_nan()) {
            return Err(PipelineError::invalid("labels or scores contain NaN"));
        }
        self.y_true.extend_from_slice(y_true);
        self.y_score.extend_from_slice(y_score);
        Ok(())
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.y_true.is_empty() {
            return Err(PipelineError::invalid("nothing has been collected yet"));
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.y_true.clear();
        self.y_score.clear();
    }
}

/// Names used for the default result file.
#[derive(Debug, Clone)]
struct RunNames {
    model:   String,
    dataset: String,
}

impl RunNames {
    fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            model:   config.get_string_or("model", "model")?,
            dataset: config.get_string_or("dataset", "dataset")?,
        })
    }
}

fn write_report(
    report:   &EvalReport,
    dir:      &Path,
    filename: Option<&str>,
    names:    &RunNames,
) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let stem = match filename {
        Some(name) => name.to_string(),
        None => format!("{}_{}_{}", get_local_time(), names.model, names.dataset),
    };
    let path = dir.join(format!("{stem}.json"));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json).map_err(|e| PipelineError::io(&path, e))?;

    tracing::info!("Evaluation result saved to '{}'", path.display());
    Ok(path)
}

// ─── Link Prediction ──────────────────────────────────────────────────────────
pub struct LinkPredictionEvaluator {
    buffer: ScoreBuffer,
    names:  RunNames,
}

impl LinkPredictionEvaluator {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self { buffer: ScoreBuffer::default(), names: RunNames::from_config(config)? })
    }
}

impl Evaluator for LinkPredictionEvaluator {
    fn name(&self) -> &'static str { "LinkPredictionEvaluator" }

    fn collect(&mut self, y_true: &[f32], y_score: &[f32]) -> Result<()> {
        self.buffer.push(y_true, y_score)
    }

    fn evaluate(&self) -> Result<EvalReport> {
        self.buffer.ensure_not_empty()?;
        let (t, s) = (&self.buffer.y_true, &self.buffer.y_score);

        let mut report = EvalReport::new();
        report.insert("accuracy".into(), accuracy(t, s));
        report.insert("average_precision".into(), average_precision(t, s)?);
        report.insert("roc_auc".into(), roc_auc(t, s)?);
        Ok(report)
    }

    fn save_result(&self, dir: &Path, filename: Option<&str>) -> Result<PathBuf> {
        write_report(&self.evaluate()?, dir, filename, &self.names)
    }

    fn clear(&mut self) { self.buffer.clear() }
}

// ─── Node Classification ──────────────────────────────────────────────────────
pub struct NodeClassificationEvaluator {
    buffer: ScoreBuffer,
    names:  RunNames,
}

impl NodeClassificationEvaluator {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self { buffer: ScoreBuffer::default(), names: RunNames::from_config(config)? })
    }
}

impl Evaluator for NodeClassificationEvaluator {
    fn name(&self) -> &'static str { "NodeClassificationEvaluator" }

    fn collect(&mut self, y_true: &[f32], y_score: &[f32]) -> Result<()> {
        self.buffer.push(y_true, y_score)
    }

    fn evaluate(&self) -> Result<EvalReport> {
        self.buffer.ensure_not_empty()?;
        let (t, s) = (&self.buffer.y_true, &self.buffer.y_score);

        let mut report = EvalReport::new();
        report.insert("accuracy".into(), accuracy(t, s));
        report.insert("roc_auc".into(), roc_auc(t, s)?);
        Ok(report)
    }

    fn save_result(&self, dir: &Path, filename: Option<&str>) -> Result<PathBuf> {
        write_report(&self.evaluate()?, dir, filename, &self.names)
    }

    fn clear(&mut self) { self.buffer.clear() }
}

// ─── Registry ─────────────────────────────────────────────────────────────────
pub fn evaluator_registry<'a>() -> Registry<Box<dyn Evaluator>, &'a PipelineConfig> {
    let mut registry = Registry::new("evaluator");
    registry
        .register("LinkPredictionEvaluator", |cfg| {
            Ok(Box::new(LinkPredictionEvaluator::new(cfg)?) as Box<dyn Evaluator>)
        })
        .register("NodeClassificationEvaluator", |cfg| {
            Ok(Box::new(NodeClassificationEvaluator::new(cfg)?) as Box<dyn Evaluator>)
        });
    registry
}

/// Build the evaluator named by the `evaluator` config key.
pub fn get_evaluator(config: &PipelineConfig) -> Result<Box<dyn Evaluator>> {
    let name = config.require_str("evaluator")?;
    evaluator_registry().create(name, config)
}
