// ============================================================
// Layer 2: EvaluateUseCase
// ============================================================
// Runs one evaluation of a temporal graph model end to end:
//
//   Step 1: Build the run logger       (Layer 6 - infra)
//   Step 2: Seed host + backend RNGs   (Layer 6 - infra)
//   Step 3: Split by time quantiles    (Layer 4 - data)
//   Step 4: Build model + executor     (Layer 5 - ml)
//   Step 5: Restore or save weights    (Layer 6 - infra)
//   Step 6: Score the test split       (Layer 5 - ml)
//   Step 7: Evaluate + save results    (Layer 5 - ml)
//
// Everything after Step 1 runs inside the logger's scope, so
// every record of the run lands in its log file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::prelude::*;
use rand::Rng;

use crate::data::{
    loader::TemporalDataset,
    sampler::NegativeSampler,
    splitter::{temporal_signal_split, DatasetSplit, Partition, DEFAULT_TRAIN_RATIO, DEFAULT_VALID_RATIO},
};
use crate::domain::error::PipelineError;
use crate::domain::features::{DataFeature, FeatureMatrix};
use crate::domain::task::Task;
use crate::domain::traits::EvalReport;
use crate::infra::{
    checkpoint::CheckpointManager,
    config::PipelineConfig,
    logger::get_logger,
    seed::{set_random_seed, RandomContext},
};
use crate::ml::{
    evaluator::get_evaluator,
    executor::{get_executor, Executor, MODEL_RECORD},
    model::get_model,
};

pub const DEFAULT_EVALUATE_RES_DIR: &str = "./libcity/cache/evaluate_cache";

/// Upper bound on the values of one generated zero feature table.
const MAX_ZERO_FEATURE_VALUES: usize = 1 << 28;

// ─── Input Graph ──────────────────────────────────────────────────────────────
/// A dataset together with its node and edge feature tables.
pub struct GraphData {
    pub dataset:       TemporalDataset,
    pub node_features: FeatureMatrix,
    pub edge_features: FeatureMatrix,
}

impl GraphData {
    /// Zero features of width `feat_dim` for every node and edge id
    /// that occurs in `dataset`. Ids index the tables directly, so the
    /// largest id bounds their size.
    pub fn with_zero_features(dataset: TemporalDataset, feat_dim: usize) -> crate::Result<Self> {
        let max_edge = dataset.edge_index().iter().map(|r| r[0]).max().unwrap_or(0);
        let max_node = dataset
            .edge_index()
            .iter()
            .map(|r| r[1].max(r[2]))
            .max()
            .unwrap_or(0);

        Ok(Self {
            node_features: zero_table("node", max_node, feat_dim)?,
            edge_features: zero_table("edge", max_edge, feat_dim)?,
            dataset,
        })
    }

    /// Load the interactions from `path`; features are all zero.
    pub fn from_csv(path: impl AsRef<Path>, feat_dim: usize) -> Result<Self> {
        let path = path.as_ref();
        let dataset = TemporalDataset::from_csv(path)
            .with_context(|| format!("Cannot load dataset '{}'", path.display()))?;
        Ok(Self::with_zero_features(dataset, feat_dim)?)
    }
}

/// A zero table with a row for every id up to `max_id`.
fn zero_table(what: &str, max_id: u64, feat_dim: usize) -> crate::Result<FeatureMatrix> {
    let rows = usize::try_from(max_id)
        .ok()
        .and_then(|id| id.checked_add(1))
        .filter(|rows| {
            rows.checked_mul(feat_dim.max(1))
                .is_some_and(|n| n <= MAX_ZERO_FEATURE_VALUES)
        })
        .ok_or_else(|| {
            PipelineError::invalid(format!(
                "{what} id {max_id} is too large for a dense {what} feature table"
            ))
        })?;
    Ok(FeatureMatrix::zeros(rows, feat_dim))
}

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
pub struct EvaluateUseCase {
    config: PipelineConfig,
}

impl EvaluateUseCase {
    /// An `exp_id` is drawn at random when `config` has none.
    pub fn new(mut config: PipelineConfig) -> Self {
        if !config.contains("exp_id") {
            let exp_id: u32 = rand::thread_rng().gen_range(0..100_000);
            config.set("exp_id", exp_id);
        }
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute the full evaluation and return the metric report.
    pub fn execute<B: Backend>(&self, data: &GraphData, device: &B::Device) -> Result<EvalReport> {
        let cfg = &self.config;

        // ── Step 1: Logger ────────────────────────────────────────────────────
        let log_dir = cfg.get_str("log_dir")?.map(PathBuf::from);
        let logger  = get_logger(cfg, log_dir.as_deref())?;

        let task    = cfg.display_value("task")?;
        let model   = cfg.display_value("model")?;
        let dataset = cfg.display_value("dataset")?;
        let exp_id  = cfg.display_value("exp_id")?;

        logger.in_scope(|| {
            tracing::info!(
                "Begin pipeline, task={}, model_name={}, dataset_name={}, exp_id={}",
                task, model, dataset, exp_id,
            );
            self.run::<B>(data, device)
        })
    }

    fn run<B: Backend>(&self, data: &GraphData, device: &B::Device) -> Result<EvalReport> {
        let cfg = &self.config;

        // ── Step 2: Seed ──────────────────────────────────────────────────────
        let mut random = set_random_seed::<B>(cfg.get_u64_or("seed", 0)?);

        // ── Step 3: Temporal split ────────────────────────────────────────────
        let split = temporal_signal_split(
            &data.dataset,
            cfg.get_f64_or("train_ratio", DEFAULT_TRAIN_RATIO)?,
            cfg.get_f64_or("valid_ratio", DEFAULT_VALID_RATIO)?,
        )?;

        // ── Step 4: Model and executor ────────────────────────────────────────
        let model = get_model::<B>(cfg, &data.node_features, &data.edge_features, device)?;
        let data_feature = DataFeature::from_features(&data.node_features, &data.edge_features);
        let mut executor = get_executor(cfg, model, data_feature)?;

        // ── Step 5: Checkpoint ────────────────────────────────────────────────
        if let Some(dir) = executor.checkpoint_dir().map(PathBuf::from) {
            if CheckpointManager::new(&dir)?.has_module::<B>(MODEL_RECORD) {
                executor.load_model(&dir)?;
            } else {
                executor.save_model(&dir)?;
            }
        }

        // ── Step 6 + 7: Score and evaluate ────────────────────────────────────
        let mut evaluator = get_evaluator(cfg)?;
        let (y_true, y_score) = score_test_split(executor.as_ref(), &split, &data.dataset, &mut random)?;
        evaluator.collect(&y_true, &y_score)?;

        let report = evaluator.evaluate()?;
        for (metric, value) in &report {
            tracing::info!("{}: {:.4}", metric, value);
        }

        let res_dir = cfg.get_string_or("evaluate_res_dir", DEFAULT_EVALUATE_RES_DIR)?;
        evaluator.save_result(Path::new(&res_dir), None)?;
        Ok(report)
    }
}

/// Labels and scores of the test split for the executor's task.
fn score_test_split<B: Backend>(
    executor: &dyn Executor<B>,
    split:    &DatasetSplit,
    dataset:  &TemporalDataset,
    random:   &mut RandomContext,
) -> Result<(Vec<f32>, Vec<f32>)> {
    if split.test.is_empty() {
        return Err(PipelineError::invalid("the test split has no interactions").into());
    }

    match executor.task() {
        Task::LinkPrediction => {
            let sampler   = NegativeSampler::from_destinations(&split.train)?;
            let negatives = sampler.corrupt(&split.test, random.rng())?;

            let mut y_score = executor.predict(&split.test)?;
            y_score.extend(executor.predict(&negatives)?);

            let n = split.test.interaction_count();
            let mut y_true = vec![1.0f32; n];
            y_true.extend(vec![0.0f32; n]);
            Ok((y_true, y_score))
        }
        Task::NodeClassification => {
            let labels = dataset.labels().ok_or_else(|| {
                PipelineError::invalid("node classification needs a labelled dataset")
            })?;
            let y_true: Vec<f32> = dataset
                .timestamps()
                .iter()
                .zip(labels)
                .filter(|&(&ts, _)| split.thresholds.partition_of(ts) == Partition::Test)
                .map(|(_, &label)| label)
                .collect();

            let y_score = executor.predict(&split.test)?;
            Ok((y_true, y_score))
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use std::fs;

    use serial_test::serial;

    type B = NdArray;

    /// 20 interactions at t = 0..19; the last three form the test split.
    fn write_csv(dir: &Path) -> PathBuf {
        let mut csv = String::from(",u,i,ts,label,idx\n");
        for k in 0..20u64 {
            let label = if k % 2 == 1 { 1 } else { 0 };
            csv.push_str(&format!("{k},{},{},{k}.0,{label},{}\n", k % 5, 5 + k % 4, k + 1));
        }
        let path = dir.join("ml_toy.csv");
        fs::write(&path, csv).unwrap();
        path
    }

    fn config(dir: &Path, task: &str, evaluator: &str) -> PipelineConfig {
        PipelineConfig::new()
            .with("exp_id", 7)
            .with("model", "CAW")
            .with("dataset", "toy")
            .with("task", task)
            .with("evaluator", evaluator)
            .with("seed", 3)
            .with("log_dir", dir.join("log").to_string_lossy().to_string())
            .with("evaluate_res_dir", dir.join("res").to_string_lossy().to_string())
    }

    #[test]
    #[serial]
    fn test_link_prediction_run() {
        let dir  = tempfile::tempdir().unwrap();
        let data = GraphData::from_csv(write_csv(dir.path()), 4).unwrap();
        assert_eq!(data.node_features.rows(), 9);
        assert_eq!(data.edge_features.rows(), 21);

        let ckpt = dir.path().join("ckpt");
        let cfg = config(dir.path(), "link_prediction", "LinkPredictionEvaluator")
            .with("saved_file", ckpt.to_string_lossy().to_string());
        let use_case = EvaluateUseCase::new(cfg);

        let report = use_case.execute::<B>(&data, &Default::default()).unwrap();
        assert_eq!(report.len(), 3);
        assert!((0.0..=1.0).contains(&report["roc_auc"]));
        let record = ckpt.join("caw_model.mpk");
        assert!(record.exists());
        let saved = fs::read(&record).unwrap();

        // a differently seeded run loads the record instead of replacing it
        let reseeded = EvaluateUseCase::new(use_case.config().clone().with("seed", 4));
        let again = reseeded.execute::<B>(&data, &Default::default()).unwrap();
        assert_eq!(again.len(), 3);
        assert_eq!(fs::read(&record).unwrap(), saved);

        let results = fs::read_dir(dir.path().join("res")).unwrap().count();
        assert!(results >= 1);
        let logs: Vec<_> = fs::read_dir(dir.path().join("log"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert!(logs.iter().all(|n| n.starts_with("7-CAW-toy-link_prediction-")), "{logs:?}");
    }

    #[test]
    #[serial]
    fn test_node_classification_run() {
        let dir  = tempfile::tempdir().unwrap();
        let data = GraphData::from_csv(write_csv(dir.path()), 4).unwrap();

        let cfg = config(dir.path(), "node_classification", "NodeClassificationEvaluator");
        let report = EvaluateUseCase::new(cfg).execute::<B>(&data, &Default::default()).unwrap();
        let keys: Vec<&str> = report.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["accuracy", "roc_auc"]);
    }

    #[test]
    #[serial]
    fn test_unlabelled_node_classification_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = TemporalDataset::new(
            (0..10).map(|k| [k, k % 3, 3 + k % 2]).collect(),
            (0..10).map(|k| k as f64).collect(),
            None,
        )
        .unwrap();
        let data = GraphData::with_zero_features(dataset, 2).unwrap();

        let cfg = config(dir.path(), "node_classification", "NodeClassificationEvaluator");
        assert!(EvaluateUseCase::new(cfg).execute::<B>(&data, &Default::default()).is_err());
    }

    #[test]
    fn test_missing_exp_id_is_generated() {
        let use_case = EvaluateUseCase::new(PipelineConfig::new());
        assert!(use_case.config().contains("exp_id"));
    }

    #[test]
    fn test_huge_ids_are_rejected() {
        let dataset = TemporalDataset::new(vec![[0, u64::MAX, 1]], vec![0.0], None).unwrap();
        let err = GraphData::with_zero_features(dataset, 4).err().unwrap();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        let dataset = TemporalDataset::new(vec![[0, 10_000_000_000, 1]], vec![0.0], None).unwrap();
        assert!(GraphData::with_zero_features(dataset, 4).is_err());

        let dataset = TemporalDataset::new(vec![[u64::MAX, 0, 1]], vec![0.0], None).unwrap();
        assert!(GraphData::with_zero_features(dataset, 4).is_err());
    }
}
