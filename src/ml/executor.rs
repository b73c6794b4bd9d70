// ============================================================
// Layer 5: Task Executors
// ============================================================
// An executor binds a model to a task. It knows how to turn an
// InteractionSet into one probability per interaction and how
// to persist the weights it owns:
//
//   link_prediction     → P(edge src → dst exists), from the
//                         model's affinity head
//   node_classification → P(source node is in the positive
//                         class), from an MLP decoder on top
//                         of the model's node embeddings
//
// Executors are created by name from the `task` config key
// through the executor registry.

use std::path::Path;

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::domain::error::{PipelineError, Result};
use crate::domain::features::DataFeature;
use crate::domain::interaction::InteractionSet;
use crate::domain::task::Task;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::config::PipelineConfig;
use crate::infra::registry::Registry;
use crate::ml::model::{index_tensor, tensor_to_vec, CawConfig, CawModel};

pub const MODEL_RECORD:   &str = "caw_model";
const CONFIG_FILE:    &str = "caw_config.json";
const DECODER_RECORD: &str = "node_decoder";

// ─── Executor Trait ───────────────────────────────────────────────────────────
pub trait Executor<B: Backend> {
    fn task(&self) -> Task;

    fn model(&self) -> &CawModel<B>;

    /// Checkpoint directory configured through `saved_file`, if any.
    fn checkpoint_dir(&self) -> Option<&str>;

    /// One probability per interaction of `data`, in order.
    fn predict(&self, data: &InteractionSet) -> Result<Vec<f32>>;

    fn save_model(&self, dir: &Path) -> anyhow::Result<()>;

    fn load_model(&mut self, dir: &Path) -> anyhow::Result<()>;
}

/// Everything an executor constructor receives.
pub struct ExecutorArgs<'a, B: Backend> {
    pub config:       &'a PipelineConfig,
    pub model:        CawModel<B>,
    pub data_feature: DataFeature,
}

fn check_nodes(data: &InteractionSet, data_feature: &DataFeature) -> Result<()> {
    match data.unique_nodes().iter().next_back() {
        Some(&max) if max >= data_feature.num_nodes as u64 => {
            Err(PipelineError::invalid(format!(
                "node id {max} is outside the {} nodes of the feature table",
                data_feature.num_nodes
            )))
        }
        _ => Ok(()),
    }
}

// ─── Link Prediction ──────────────────────────────────────────────────────────
pub struct LinkPredictionExecutor<B: Backend> {
    model:        CawModel<B>,
    model_config: CawConfig,
    data_feature: DataFeature,
}

impl<B: Backend> LinkPredictionExecutor<B> {
    pub fn new(config: &PipelineConfig, model: CawModel<B>, data_feature: DataFeature) -> Result<Self> {
        Ok(Self { model, model_config: CawConfig::from_config(config)?, data_feature })
    }
}

impl<B: Backend> Executor<B> for LinkPredictionExecutor<B> {
    fn task(&self) -> Task { Task::LinkPrediction }

    fn model(&self) -> &CawModel<B> { &self.model }

    fn checkpoint_dir(&self) -> Option<&str> { self.model_config.saved_file.as_deref() }

    fn predict(&self, data: &InteractionSet) -> Result<Vec<f32>> {
        check_nodes(data, &self.data_feature)?;
        self.model.score_interactions(data)
    }

    fn save_model(&self, dir: &Path) -> anyhow::Result<()> {
        let manager = CheckpointManager::new(dir)?;
        manager.save_module::<B, _>(&self.model, MODEL_RECORD)?;
        manager.save_config(&self.model_config, CONFIG_FILE)?;
        tracing::info!("Saved link prediction model to '{}'", dir.display());
        Ok(())
    }

    fn load_model(&mut self, dir: &Path) -> anyhow::Result<()> {
        let manager = CheckpointManager::new(dir)?;
        let device  = self.model.device();
        self.model  = manager.load_module::<B, _>(self.model.clone(), MODEL_RECORD, &device)?;
        tracing::info!("Loaded link prediction model from '{}'", dir.display());
        Ok(())
    }
}

// ─── Node Classification ──────────────────────────────────────────────────────
/// feat_dim → 80 → 10 → 1 MLP over node embeddings.
#[derive(Module, Debug)]
pub struct NodeDecoder<B: Backend> {
    pub fc1:     Linear<B>,
    pub fc2:     Linear<B>,
    pub fc3:     Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> NodeDecoder<B> {
    pub fn new(feat_dim: usize, drop_out: f64, device: &B::Device) -> Self {
        Self {
            fc1:     LinearConfig::new(feat_dim, 80).init(device),
            fc2:     LinearConfig::new(80, 10).init(device),
            fc3:     LinearConfig::new(10, 1).init(device),
            dropout: DropoutConfig::new(drop_out).init(),
        }
    }

    /// [n, feat_dim] → [n, 1] logits
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.dropout.forward(relu(self.fc1.forward(x)));
        let x = self.dropout.forward(relu(self.fc2.forward(x)));
        self.fc3.forward(x)
    }
}

pub struct NodeClassificationExecutor<B: Backend> {
    model:        CawModel<B>,
    decoder:      NodeDecoder<B>,
    model_config: CawConfig,
    data_feature: DataFeature,
}

impl<B: Backend> NodeClassificationExecutor<B> {
    pub fn new(config: &PipelineConfig, model: CawModel<B>, data_feature: DataFeature) -> Result<Self> {
        let model_config = CawConfig::from_config(config)?;
        let decoder = NodeDecoder::new(model.feat_dim, model_config.drop_out, &model.device());
        Ok(Self { model, decoder, model_config, data_feature })
    }
}

impl<B: Backend> Executor<B> for NodeClassificationExecutor<B> {
    fn task(&self) -> Task { Task::NodeClassification }

    fn model(&self) -> &CawModel<B> { &self.model }

    fn checkpoint_dir(&self) -> Option<&str> { self.model_config.saved_file.as_deref() }

    fn predict(&self, data: &InteractionSet) -> Result<Vec<f32>> {
        check_nodes(data, &self.data_feature)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let src = index_tensor::<B>(data.sources(), self.model.num_nodes, "node", &self.model.device())?;
        let logits = self.decoder.forward(self.model.embed_nodes(src));
        tensor_to_vec(sigmoid(logits))
    }

    fn save_model(&self, dir: &Path) -> anyhow::Result<()> {
        let manager = CheckpointManager::new(dir)?;
        manager.save_module::<B, _>(&self.model, MODEL_RECORD)?;
        manager.save_module::<B, _>(&self.decoder, DECODER_RECORD)?;
        manager.save_config(&self.model_config, CONFIG_FILE)?;
        tracing::info!("Saved node classification model to '{}'", dir.display());
        Ok(())
    }

    fn load_model(&mut self, dir: &Path) -> anyhow::Result<()> {
        let manager  = CheckpointManager::new(dir)?;
        let device   = self.model.device();
        self.model   = manager.load_module::<B, _>(self.model.clone(), MODEL_RECORD, &device)?;
        self.decoder = manager.load_module::<B, _>(self.decoder.clone(), DECODER_RECORD, &device)?;
        tracing::info!("Loaded node classification model from '{}'", dir.display());
        Ok(())
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────
pub fn executor_registry<'a, B: Backend>() -> Registry<Box<dyn Executor<B>>, ExecutorArgs<'a, B>> {
    let mut registry = Registry::new("executor");
    registry
        .register("link_prediction", build_link_prediction::<B>)
        .register("node_classification", build_node_classification::<B>);
    registry
}

fn build_link_prediction<B: Backend>(args: ExecutorArgs<'_, B>) -> Result<Box<dyn Executor<B>>> {
    Ok(Box::new(LinkPredictionExecutor::new(args.config, args.model, args.data_feature)?))
}

fn build_node_classification<B: Backend>(args: ExecutorArgs<'_, B>) -> Result<Box<dyn Executor<B>>> {
    Ok(Box::new(NodeClassificationExecutor::new(args.config, args.model, args.data_feature)?))
}

/// Build the executor for the `task` config key.
pub fn get_executor<B: Backend>(
    config:       &PipelineConfig,
    model:        CawModel<B>,
    data_feature: DataFeature,
) -> Result<Box<dyn Executor<B>>> {
    let task = config.require_str("task")?;
    executor_registry::<B>().create(task, ExecutorArgs { config, model, data_feature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::domain::features::FeatureMatrix;
    use serial_test::serial;

    type B = NdArray;

    fn setup(task: &str) -> (PipelineConfig, CawModel<B>, DataFeature) {
        let nodes = FeatureMatrix::new(6, 4, (0..24).map(|v| (v as f32).sin()).collect()).unwrap();
        let edges = FeatureMatrix::new(8, 2, (0..16).map(|v| (v as f32).cos()).collect()).unwrap();
        let cfg = PipelineConfig::new().with("model", "CAW").with("task", task);
        let model = CawConfig::new().init::<B>(&nodes, &edges, &Default::default()).unwrap();
        (cfg, model, DataFeature::from_features(&nodes, &edges))
    }

    fn interactions() -> InteractionSet {
        InteractionSet::new(vec![0, 1, 2, 5], vec![3, 4, 5, 0], vec![0.0, 1.0, 2.0, 3.0], vec![0, 1, 2, 7])
            .unwrap()
    }

    #[test]
    #[serial]
    fn test_registry_picks_executor_by_task() {
        let (cfg, model, df) = setup("link_prediction");
        let exec = get_executor(&cfg, model.clone(), df).unwrap();
        assert_eq!(exec.task(), Task::LinkPrediction);

        let cfg = cfg.with("task", "node_classification");
        let exec = get_executor(&cfg, model, df).unwrap();
        assert_eq!(exec.task(), Task::NodeClassification);
    }

    #[test]
    #[serial]
    fn test_unknown_task_is_not_found() {
        let (cfg, model, df) = setup("graph_generation");
        let err = get_executor(&cfg, model, df).err().unwrap();
        assert!(matches!(err, PipelineError::NotFound { kind: "executor", .. }));
    }

    #[test]
    #[serial]
    fn test_predict_gives_one_probability_per_interaction() {
        for task in ["link_prediction", "node_classification"] {
            let (cfg, model, df) = setup(task);
            let exec = get_executor(&cfg, model, df).unwrap();
            let scores = exec.predict(&interactions()).unwrap();
            assert_eq!(scores.len(), 4, "{task}");
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)), "{task}");
        }
    }

    #[test]
    #[serial]
    fn test_predict_rejects_unknown_nodes() {
        let (cfg, model, df) = setup("node_classification");
        let exec = get_executor(&cfg, model, df).unwrap();
        let set = InteractionSet::new(vec![6], vec![0], vec![0.0], vec![0]).unwrap();
        assert!(exec.predict(&set).is_err());
    }

    #[test]
    #[serial]
    fn test_save_and_load_restore_scores() {
        let dir = tempfile::tempdir().unwrap();
        let data = interactions();

        for task in ["link_prediction", "node_classification"] {
            let ckpt = dir.path().join(task);
            let (cfg, model, df) = setup(task);
            let trained = get_executor(&cfg, model, df).unwrap();
            let before = trained.predict(&data).unwrap();
            trained.save_model(&ckpt).unwrap();
            assert!(ckpt.join(CONFIG_FILE).exists());

            // fresh weights, then restore
            let (cfg, model, df) = setup(task);
            let mut restored = get_executor(&cfg, model, df).unwrap();
            restored.load_model(&ckpt).unwrap();
            let after = restored.predict(&data).unwrap();

            for (a, b) in before.iter().zip(&after) {
                // CompactRecorder stores half precision
                assert!((a - b).abs() < 1e-2, "{task}: {a} vs {b}");
            }
        }
    }
}
