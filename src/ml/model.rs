// ============================================================
// Layer 5: CAW Scoring Model
// ============================================================
// A (src, dst, edge) triple is scored as follows:
//
//   node / edge ids ──▶ feature rows ──▶ linear projections
//                                            │
//   [h_src + e, h_dst + e] ──▶ merge MLP ──▶ affinity logit
//
// The model is built by name from the `model` config key
// through the model registry.

use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::{
        activation::{relu, sigmoid},
        TensorData,
    },
};

use crate::domain::error::{self, PipelineError};
use crate::domain::features::FeatureMatrix;
use crate::domain::interaction::InteractionSet;
use crate::infra::config::PipelineConfig;
use crate::infra::registry::Registry;

// Hyperparameters of a CAW (causal anonymous walk) model, read from the
// run configuration. Only the feature tables and the affinity head are
// built here; the walk sampler and walk encoder live elsewhere.
#[derive(Config, Debug)]
pub struct CawConfig {
    #[config(default = "String::from(\"walk\")")]
    pub agg:             String,
    #[config(default = 2)]
    pub n_layer:         usize,
    #[config(default = "String::from(\"time\")")]
    pub time:            String,
    #[config(default = "String::from(\"attn\")")]
    pub attn_agg_method: String,
    #[config(default = "String::from(\"prod\")")]
    pub attn_mode:       String,
    #[config(default = 2)]
    pub attn_n_head:     usize,
    #[config(default = 0.1)]
    pub drop_out:        f64,
    #[config(default = 108)]
    pub pos_dim:         usize,
    #[config(default = "String::from(\"lp\")")]
    pub pos_enc:         String,
    #[config(default = "vec![32]")]
    pub n_degree:        Vec<usize>,
    #[config(default = 8)]
    pub walk_n_head:     usize,
    #[config(default = false)]
    pub walk_mutual:     bool,
    #[config(default = false)]
    pub walk_linear_out: bool,
    #[config(default = "String::from(\"attn\")")]
    pub walk_pool:       String,
    #[config(default = 1)]
    pub cpu_cores:       usize,
    #[config(default = 1)]
    pub verbosity:       usize,
    pub saved_file:      Option<String>,
}

impl CawConfig {
    /// Read every CAW hyperparameter from `config`, keeping defaults for
    /// absent keys. `walk_mutual` only applies to attention walk pooling.
    pub fn from_config(config: &PipelineConfig) -> error::Result<Self> {
        let d = Self::new();
        let walk_pool = config.get_string_or("walk_pool", &d.walk_pool)?;
        let walk_mutual = walk_pool == "attn" && config.get_bool_or("walk_mutual", d.walk_mutual)?;

        Ok(Self {
            agg:             config.get_string_or("agg", &d.agg)?,
            n_layer:         config.get_usize_or("n_layer", d.n_layer)?,
            time:            config.get_string_or("time", &d.time)?,
            attn_agg_method: config.get_string_or("attn_agg_method", &d.attn_agg_method)?,
            attn_mode:       config.get_string_or("attn_mode", &d.attn_mode)?,
            attn_n_head:     config.get_usize_or("attn_n_head", d.attn_n_head)?,
            drop_out:        config.get_f64_or("drop_out", d.drop_out)?,
            pos_dim:         config.get_usize_or("pos_dim", d.pos_dim)?,
            pos_enc:         config.get_string_or("pos_enc", &d.pos_enc)?,
            n_degree:        config.get_usize_list_or("n_degree", &d.n_degree)?,
            walk_n_head:     config.get_usize_or("walk_n_head", d.walk_n_head)?,
            walk_mutual,
            walk_linear_out: config.get_bool_or("walk_linear_out", d.walk_linear_out)?,
            walk_pool,
            cpu_cores:       config.get_usize_or("cpu_cores", d.cpu_cores)?,
            verbosity:       config.get_usize_or("verbosity", d.verbosity)?,
            saved_file:      config.get_str("saved_file")?.map(str::to_string),
        })
    }

    pub fn init<B: Backend>(
        &self,
        node_features: &FeatureMatrix,
        edge_features: &FeatureMatrix,
        device:        &B::Device,
    ) -> error::Result<CawModel<B>> {
        for (name, m) in [("node", node_features), ("edge", edge_features)] {
            if m.rows() == 0 || m.cols() == 0 {
                return Err(PipelineError::invalid(format!(
                    "{name} feature table is empty ({}x{})",
                    m.rows(),
                    m.cols()
                )));
            }
        }
        if !(0.0..1.0).contains(&self.drop_out) {
            return Err(PipelineError::invalid(format!(
                "drop_out must lie in [0, 1), got {}",
                self.drop_out
            )));
        }

        let feat_dim = node_features.cols();
        Ok(CawModel {
            node_features: Param::from_tensor(matrix_tensor(node_features, device)),
            edge_features: Param::from_tensor(matrix_tensor(edge_features, device)),
            node_proj:     LinearConfig::new(feat_dim, feat_dim).init(device),
            edge_proj:     LinearConfig::new(edge_features.cols(), feat_dim).init(device),
            merge_fc1:     LinearConfig::new(2 * feat_dim, feat_dim).init(device),
            merge_fc2:     LinearConfig::new(feat_dim, 1).init(device),
            dropout:       DropoutConfig::new(self.drop_out).init(),
            num_nodes:     node_features.rows(),
            num_edges:     edge_features.rows(),
            feat_dim,
        })
    }
}

#[derive(Module, Debug)]
pub struct CawModel<B: Backend> {
    pub node_features: Param<Tensor<B, 2>>,
    pub edge_features: Param<Tensor<B, 2>>,
    pub node_proj:     Linear<B>,
    pub edge_proj:     Linear<B>,
    pub merge_fc1:     Linear<B>,
    pub merge_fc2:     Linear<B>,
    pub dropout:       Dropout,
    pub num_nodes:     usize,
    pub num_edges:     usize,
    pub feat_dim:      usize,
}

impl<B: Backend> CawModel<B> {
    pub fn device(&self) -> B::Device {
        self.node_features.val().device()
    }

    /// nodes: [n] → [n, feat_dim]
    pub fn embed_nodes(&self, nodes: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        self.node_proj.forward(self.node_features.val().select(0, nodes))
    }

    /// edges: [n] → [n, feat_dim]
    pub fn embed_edges(&self, edges: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        self.edge_proj.forward(self.edge_features.val().select(0, edges))
    }

    /// Affinity logits of (src, dst) pairs observed through `edges`: [n] → [n, 1]
    pub fn forward(
        &self,
        src:   Tensor<B, 1, Int>,
        dst:   Tensor<B, 1, Int>,
        edges: Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let e     = self.embed_edges(edges);
        let h_src = self.embed_nodes(src) + e.clone();
        let h_dst = self.embed_nodes(dst) + e;

        let x = Tensor::cat(vec![h_src, h_dst], 1); // [n, 2 * feat_dim]
        let x = self.dropout.forward(relu(self.merge_fc1.forward(x)));
        self.merge_fc2.forward(x)
    }

    /// Link probability of every interaction in `set`.
    pub fn score_interactions(&self, set: &InteractionSet) -> error::Result<Vec<f32>> {
        if set.is_empty() {
            return Ok(Vec::new());
        }
        let device = self.device();
        let src   = index_tensor::<B>(set.sources(), self.num_nodes, "node", &device)?;
        let dst   = index_tensor::<B>(set.destinations(), self.num_nodes, "node", &device)?;
        let edges = index_tensor::<B>(set.edge_ids(), self.num_edges, "edge", &device)?;

        tensor_to_vec(sigmoid(self.forward(src, dst, edges)))
    }
}

fn matrix_tensor<B: Backend>(m: &FeatureMatrix, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(m.values().to_vec(), [m.rows(), m.cols()]), device)
}

/// Ids as an Int index tensor, rejecting ids without a feature row.
pub(crate) fn index_tensor<B: Backend>(
    ids:    &[u64],
    bound:  usize,
    what:   &str,
    device: &B::Device,
) -> error::Result<Tensor<B, 1, Int>> {
    let idx = ids
        .iter()
        .map(|&id| match usize::try_from(id) {
            Ok(i) if i < bound => Ok(i as i64),
            _ => Err(PipelineError::invalid(format!(
                "{what} id {id} has no feature row (table has {bound} rows)"
            ))),
        })
        .collect::<error::Result<Vec<i64>>>()?;

    let len = idx.len();
    Ok(Tensor::from_data(TensorData::new(idx, [len]), device))
}

pub(crate) fn tensor_to_vec<B: Backend, const D: usize>(t: Tensor<B, D>) -> error::Result<Vec<f32>> {
    t.into_data()
        .to_vec::<f32>()
        .map_err(|e| PipelineError::Tensor(format!("{e:?}")))
}

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct ModelArgs<'a, B: Backend> {
    pub config:        &'a PipelineConfig,
    pub node_features: &'a FeatureMatrix,
    pub edge_features: &'a FeatureMatrix,
    pub device:        &'a B::Device,
}

pub fn model_registry<'a, B: Backend>() -> Registry<CawModel<B>, ModelArgs<'a, B>> {
    let mut registry = Registry::new("model");
    registry.register("CAW", build_caw::<B>);
    registry
}

fn build_caw<B: Backend>(args: ModelArgs<'_, B>) -> error::Result<CawModel<B>> {
    let caw = CawConfig::from_config(args.config)?;
    tracing::info!(
        "Building CAW: {} nodes x {} features, {} edges x {} features, walk_pool={}",
        args.node_features.rows(),
        args.node_features.cols(),
        args.edge_features.rows(),
        args.edge_features.cols(),
        caw.walk_pool,
    );
    caw.init(args.node_features, args.edge_features, args.device)
}

/// Build the model named by the `model` config key.
pub fn get_model<B: Backend>(
    config:        &PipelineConfig,
    node_features: &FeatureMatrix,
    edge_features: &FeatureMatrix,
    device:        &B::Device,
) -> error::Result<CawModel<B>> {
    let name = config.require_str("model")?;
    model_registry::<B>().create(
        name,
        ModelArgs { config, node_features, edge_features, device },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use serial_test::serial;

    type B = NdArray;

    fn features() -> (FeatureMatrix, FeatureMatrix) {
        let nodes = FeatureMatrix::new(4, 3, (0..12).map(|v| v as f32 / 12.0).collect()).unwrap();
        let edges = FeatureMatrix::new(5, 2, (0..10).map(|v| v as f32 / 10.0).collect()).unwrap();
        (nodes, edges)
    }

    #[test]
    fn test_config_reads_overrides() {
        let cfg = PipelineConfig::new()
            .with("n_layer", 3)
            .with("walk_pool", "sum")
            .with("walk_mutual", true)
            .with("n_degree", serde_json::json!(["64", "1"]))
            .with("saved_file", "ckpt");
        let caw = CawConfig::from_config(&cfg).unwrap();
        assert_eq!(caw.n_layer, 3);
        assert_eq!(caw.walk_pool, "sum");
        assert!(!caw.walk_mutual);
        assert_eq!(caw.n_degree, vec![64, 1]);
        assert_eq!(caw.saved_file.as_deref(), Some("ckpt"));
        assert_eq!(caw.attn_mode, "prod");
    }

    #[test]
    fn test_walk_mutual_kept_for_attention_pooling() {
        let cfg = PipelineConfig::new().with("walk_mutual", true);
        assert!(CawConfig::from_config(&cfg).unwrap().walk_mutual);
    }

    #[test]
    #[serial]
    fn test_get_model_and_score() {
        let (nodes, edges) = features();
        let device = Default::default();
        let cfg = PipelineConfig::new().with("model", "CAW");

        let model = get_model::<B>(&cfg, &nodes, &edges, &device).unwrap();
        assert_eq!(model.feat_dim, 3);

        let set = InteractionSet::new(vec![0, 1, 2], vec![3, 2, 1], vec![1.0, 2.0, 3.0], vec![0, 1, 4])
            .unwrap();
        let scores = model.score_interactions(&set).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_unknown_model_is_not_found() {
        let (nodes, edges) = features();
        let cfg = PipelineConfig::new().with("model", "TGN");
        let err = get_model::<B>(&cfg, &nodes, &edges, &Default::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { kind: "model", .. }));
    }

    #[test]
    fn test_missing_model_key_is_not_found() {
        let (nodes, edges) = features();
        let err = get_model::<B>(&PipelineConfig::new(), &nodes, &edges, &Default::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_out_of_range_node_is_invalid() {
        let (nodes, edges) = features();
        let model = CawConfig::new().init::<B>(&nodes, &edges, &Default::default()).unwrap();
        let set = InteractionSet::new(vec![9], vec![0], vec![0.0], vec![0]).unwrap();
        let err = model.score_interactions(&set).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
