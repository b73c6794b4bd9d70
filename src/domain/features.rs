// ============================================================
// Layer 3: Feature Tables
// ============================================================
// Node and edge features arrive as dense row-major matrices:
// row k holds the feature vector of node (or edge) id k.
// DataFeature summarises both tables for executors, which use
// it to reject ids that have no feature row.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// A dense `rows x cols` matrix of f32 stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    rows:   usize,
    cols:   usize,
    values: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self> {
        if rows * cols != values.len() {
            return Err(PipelineError::invalid(format!(
                "feature matrix {rows}x{cols} needs {} values, got {}",
                rows * cols,
                values.len(),
            )));
        }
        Ok(Self { rows, cols, values })
    }

    /// All-zero features, the usual choice for featureless graphs.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, values: vec![0.0; rows * cols] }
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn cols(&self) -> usize { self.cols }

    pub fn values(&self) -> &[f32] { &self.values }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        (index < self.rows).then(|| &self.values[index * self.cols..(index + 1) * self.cols])
    }
}

/// Shape summary of the graph features handed to executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFeature {
    pub num_nodes:        usize,
    pub num_edges:        usize,
    pub node_feature_dim: usize,
    pub edge_feature_dim: usize,
}

impl DataFeature {
    pub fn from_features(node_features: &FeatureMatrix, edge_features: &FeatureMatrix) -> Self {
        Self {
            num_nodes:        node_features.rows(),
            num_edges:        edge_features.rows(),
            node_feature_dim: node_features.cols(),
            edge_feature_dim: edge_features.cols(),
        }
    }
}
