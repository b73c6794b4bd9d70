// ============================================================
// Layer 4: Negative Edge Sampler
// ============================================================
// Link prediction is scored against corrupted interactions:
// each observed (src, dst, t) is paired with (src, dst', t)
// where dst' is drawn uniformly from a pool of known nodes.
// The pool is usually the destinations seen in training.

use rand::{seq::SliceRandom, Rng};

use crate::domain::error::{PipelineError, Result};
use crate::domain::interaction::{InteractionSet, NodeId};

pub struct NegativeSampler {
    pool: Vec<NodeId>,
}

impl NegativeSampler {
    pub fn new(pool: impl IntoIterator<Item = NodeId>) -> Result<Self> {
        let mut pool: Vec<NodeId> = pool.into_iter().collect();
        pool.sort_unstable();
        pool.dedup();
        if pool.is_empty() {
            return Err(PipelineError::invalid("negative sampler needs at least one node"));
        }
        Ok(Self { pool })
    }

    /// Pool of every destination in `set`.
    pub fn from_destinations(set: &InteractionSet) -> Result<Self> {
        Self::new(set.destinations().iter().copied())
    }

    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<NodeId> {
        (0..count)
            .filter_map(|_| self.pool.choose(rng).copied())
            .collect()
    }

    /// Copy of `positives` with every destination resampled.
    pub fn corrupt<R: Rng + ?Sized>(&self, positives: &InteractionSet, rng: &mut R) -> Result<InteractionSet> {
        InteractionSet::new(
            positives.sources().to_vec(),
            self.sample(positives.interaction_count(), rng),
            positives.timestamps().to_vec(),
            positives.edge_ids().to_vec(),
        )
    }
}
