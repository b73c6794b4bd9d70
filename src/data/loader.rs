// ============================================================
// Layer 4: Temporal Dataset Loader
// ============================================================
// Reads a temporal interaction graph from CSV in the layout
// used by the JODIE / TGN / CAWN preprocessed datasets
// (ml_wikipedia.csv, ml_reddit.csv, ...):
//
//   ,u,i,ts,label,idx
//   0,1,8228,0.0,0,1
//   1,2,8229,36.0,0,2
//   ...
//
//   u     → source node id
//   i     → destination node id
//   ts    → interaction time
//   label → optional per-interaction state label
//   idx   → edge id (row of the edge feature table)
//
// Columns are matched by header name; the unnamed leading
// index column and any other extra column are ignored.

use std::path::Path;

use serde::Deserialize;

use crate::domain::error::{PipelineError, Result};
use crate::domain::interaction::{EdgeId, InteractionSet, NodeId};

#[derive(Debug, Deserialize)]
struct EdgeRow {
    u:     NodeId,
    i:     NodeId,
    ts:    f64,
    idx:   EdgeId,
    #[serde(default)]
    label: Option<f32>,
}

/// The raw input of the temporal splitter.
///
/// `edge_index[k]` is `(edge_id, source, destination)` and
/// `timestamps[k]` is the time of that interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalDataset {
    edge_index: Vec<[u64; 3]>,
    timestamps: Vec<f64>,
    labels:     Option<Vec<f32>>,
}

impl TemporalDataset {
    pub fn new(
        edge_index: Vec<[u64; 3]>,
        timestamps: Vec<f64>,
        labels:     Option<Vec<f32>>,
    ) -> Result<Self> {
        if edge_index.len() != timestamps.len() {
            return Err(PipelineError::invalid(format!(
                "{} edge rows but {} timestamps",
                edge_index.len(),
                timestamps.len(),
            )));
        }
        if let Some(labels) = &labels {
            if labels.len() != timestamps.len() {
                return Err(PipelineError::invalid(format!(
                    "{} labels for {} interactions",
                    labels.len(),
                    timestamps.len(),
                )));
            }
        }
        Ok(Self { edge_index, timestamps, labels })
    }

    /// Load a dataset from a CSV file with `u,i,ts,idx[,label]` columns.
    ///
    /// Labels are kept only when every row carries one.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut edge_index = Vec::new();
        let mut timestamps = Vec::new();
        let mut labels     = Vec::new();

        for row in reader.deserialize::<EdgeRow>() {
            let row = row?;
            edge_index.push([row.idx, row.u, row.i]);
            timestamps.push(row.ts);
            labels.push(row.label);
        }

        let labels: Option<Vec<f32>> = labels.into_iter().collect();

        tracing::info!(
            "Loaded {} interactions from '{}'{}",
            edge_index.len(),
            path.display(),
            if labels.is_some() { " (labelled)" } else { "" },
        );

        Self::new(edge_index, timestamps, labels)
    }

    pub fn edge_index(&self) -> &[[u64; 3]] { &self.edge_index }

    pub fn timestamps(&self) -> &[f64] { &self.timestamps }

    pub fn labels(&self) -> Option<&[f32]> { self.labels.as_deref() }

    pub fn len(&self) -> usize { self.timestamps.len() }

    pub fn is_empty(&self) -> bool { self.timestamps.is_empty() }

    /// The whole dataset as one InteractionSet.
    pub fn to_interactions(&self) -> Result<InteractionSet> {
        let edge_ids     = self.edge_index.iter().map(|r| r[0]).collect();
        let sources      = self.edge_index.iter().map(|r| r[1]).collect();
        let destinations = self.edge_index.iter().map(|r| r[2]).collect();
        InteractionSet::new(sources, destinations, self.timestamps.clone(), edge_ids)
    }
}
