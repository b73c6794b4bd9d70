// ============================================================
// Layer 3: InteractionSet Domain Type
// ============================================================
// An immutable snapshot of timestamped directed edges.
// Each interaction i is the tuple
//
//   (sources[i], destinations[i], timestamps[i], edge_ids[i])
//
// so the four vectors are always the same length. The set of
// unique nodes is derived once at construction time.
//
// The temporal splitter produces three of these (train, valid,
// test) from one full set; downstream code only ever reads them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

pub type NodeId = u64;
pub type EdgeId = u64;

/// Timestamped edges between nodes, index-aligned across all four columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSet {
    sources:      Vec<NodeId>,
    destinations: Vec<NodeId>,
    timestamps:   Vec<f64>,
    edge_ids:     Vec<EdgeId>,
    unique_nodes: BTreeSet<NodeId>,
}

impl InteractionSet {
    /// Build a set from raw aligned columns.
    ///
    /// Fails with `InvalidInput` when the columns differ in length.
    pub fn new(
        sources:      Vec<NodeId>,
        destinations: Vec<NodeId>,
        timestamps:   Vec<f64>,
        edge_ids:     Vec<EdgeId>,
    ) -> Result<Self> {
        let n = sources.len();
        if destinations.len() != n || timestamps.len() != n || edge_ids.len() != n {
            return Err(PipelineError::invalid(format!(
                "interaction columns differ in length: sources={}, destinations={}, \
                 timestamps={}, edge_ids={}",
                n,
                destinations.len(),
                timestamps.len(),
                edge_ids.len(),
            )));
        }

        let unique_nodes = sources.iter().chain(destinations.iter()).copied().collect();

        Ok(Self { sources, destinations, timestamps, edge_ids, unique_nodes })
    }

    /// Keep only the interactions whose mask entry is true, in order.
    pub fn select(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.interaction_count() {
            return Err(PipelineError::invalid(format!(
                "mask has {} entries but the set has {} interactions",
                mask.len(),
                self.interaction_count(),
            )));
        }

        fn pick<T: Copy>(column: &[T], mask: &[bool]) -> Vec<T> {
            column
                .iter()
                .zip(mask)
                .filter_map(|(&v, &keep)| keep.then_some(v))
                .collect()
        }

        Self::new(
            pick(&self.sources, mask),
            pick(&self.destinations, mask),
            pick(&self.timestamps, mask),
            pick(&self.edge_ids, mask),
        )
    }

    pub fn sources(&self) -> &[NodeId] { &self.sources }

    pub fn destinations(&self) -> &[NodeId] { &self.destinations }

    pub fn timestamps(&self) -> &[f64] { &self.timestamps }

    pub fn edge_ids(&self) -> &[EdgeId] { &self.edge_ids }

    pub fn interaction_count(&self) -> usize { self.sources.len() }

    pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    /// Union of every node seen as a source or a destination.
    pub fn unique_nodes(&self) -> &BTreeSet<NodeId> { &self.unique_nodes }

    pub fn unique_node_count(&self) -> usize { self.unique_nodes.len() }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InteractionSet {
        InteractionSet::new(
            vec![1, 2, 3, 1],
            vec![2, 3, 4, 4],
            vec![0.0, 1.0, 2.0, 3.0],
            vec![10, 11, 12, 13],
        )
        .unwrap()
    }

    #[test]
    fn test_derived_counts() {
        let set = sample();
        assert_eq!(set.interaction_count(), 4);
        assert_eq!(set.unique_node_count(), 4);
        assert!(set.unique_node_count() <= 2 * set.interaction_count());
        let nodes: Vec<NodeId> = set.unique_nodes().iter().copied().collect();
        assert_eq!(nodes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_rejects_misaligned_columns() {
        let err = InteractionSet::new(vec![1, 2], vec![2], vec![0.0, 1.0], vec![0, 1]);
        assert!(matches!(err, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn test_select_preserves_order() {
        let set = sample();
        let picked = set.select(&[true, false, true, true]).unwrap();
        assert_eq!(picked.sources(), &[1, 3, 1]);
        assert_eq!(picked.destinations(), &[2, 4, 4]);
        assert_eq!(picked.timestamps(), &[0.0, 2.0, 3.0]);
        assert_eq!(picked.edge_ids(), &[10, 12, 13]);
        assert_eq!(picked.unique_node_count(), 4);
    }

    #[test]
    fn test_empty_set() {
        let set = InteractionSet::new(vec![], vec![], vec![], vec![]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.unique_node_count(), 0);
    }
}
