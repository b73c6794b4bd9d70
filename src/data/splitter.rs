// ============================================================
// Layer 4: Temporal Train/Validation/Test Splitter
// ============================================================
// Splits an interaction dataset by time rather than at random:
// everything that happened before the first split point is
// training data, everything after the second is test data.
// This keeps future interactions out of training, which is
// what an evaluation of a temporal model needs.
//
// The split points are quantiles of the timestamp column:
//
//   t1 = quantile(timestamps, train_ratio)
//   t2 = quantile(timestamps, valid_ratio)
//
//   train: ts <= t1
//   valid: t1 < ts <= t2
//   test:  ts > t2
//
// Both ratios are cumulative, so they must be increasing:
// 0.70 / 0.85 gives roughly a 70 / 15 / 15 split. A pair in
// decreasing order is rejected instead of producing an
// inverted (empty) validation window.
//
// Ties in the timestamp column stay together, so the actual
// proportions can differ from the ratios on coarse clocks.

use crate::data::loader::TemporalDataset;
use crate::domain::error::{PipelineError, Result};
use crate::domain::interaction::InteractionSet;

pub const DEFAULT_TRAIN_RATIO: f64 = 0.70;
pub const DEFAULT_VALID_RATIO: f64 = 0.85;

/// Which side of the split points a timestamp falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Valid,
    Test,
}

/// The two timestamp thresholds of a split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitThresholds {
    pub val_time:  f64,
    pub test_time: f64,
}

impl SplitThresholds {
    pub fn partition_of(&self, ts: f64) -> Partition {
        if ts <= self.val_time {
            Partition::Train
        } else if ts <= self.test_time {
            Partition::Valid
        } else {
            Partition::Test
        }
    }
}

/// Result of [`temporal_signal_split`].
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub full:       InteractionSet,
    pub train:      InteractionSet,
    pub valid:      InteractionSet,
    pub test:       InteractionSet,
    pub thresholds: SplitThresholds,
}

/// Linear-interpolated quantile of `values` at `q` in [0, 1].
///
/// Matches the default method of numpy's `quantile`:
/// position `q * (n - 1)` in the sorted values, interpolated
/// between its two neighbouring order statistics.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(PipelineError::invalid("quantile of an empty sequence"));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(PipelineError::invalid(format!("quantile {q} is outside [0, 1]")));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(PipelineError::invalid("timestamps contain NaN"));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos  = q * (sorted.len() - 1) as f64;
    let lo   = pos.floor() as usize;
    let hi   = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Split `dataset` into train / valid / test sets by timestamp quantiles.
///
/// # Arguments
/// * `train_ratio` - cumulative fraction ending the training window, in (0, 1)
/// * `valid_ratio` - cumulative fraction ending the validation window, in (0, 1),
///   not smaller than `train_ratio`
pub fn temporal_signal_split(
    dataset:     &TemporalDataset,
    train_ratio: f64,
    valid_ratio: f64,
) -> Result<DatasetSplit> {
    for (name, ratio) in [("train_ratio", train_ratio), ("valid_ratio", valid_ratio)] {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PipelineError::invalid(format!(
                "{name} must lie in (0, 1), got {ratio}"
            )));
        }
    }
    if train_ratio > valid_ratio {
        return Err(PipelineError::invalid(format!(
            "split ratios must be increasing, got train_ratio={train_ratio} > \
             valid_ratio={valid_ratio}"
        )));
    }

    let full = dataset.to_interactions()?;

    let thresholds = SplitThresholds {
        val_time:  quantile(full.timestamps(), train_ratio)?,
        test_time: quantile(full.timestamps(), valid_ratio)?,
    };

    let mask_for = |wanted: Partition| -> Vec<bool> {
        full.timestamps()
            .iter()
            .map(|&ts| thresholds.partition_of(ts) == wanted)
            .collect()
    };

    let train = full.select(&mask_for(Partition::Train))?;
    let valid = full.select(&mask_for(Partition::Valid))?;
    let test  = full.select(&mask_for(Partition::Test))?;

    tracing::debug!(
        "Temporal split at t1={:.3}, t2={:.3}: {} train, {} valid, {} test",
        thresholds.val_time,
        thresholds.test_time,
        train.interaction_count(),
        valid.interaction_count(),
        test.interaction_count(),
    );
    tracing::debug!(
        "Unique nodes: {} full, {} train, {} valid, {} test",
        full.unique_node_count(),
        train.unique_node_count(),
        valid.unique_node_count(),
        test.unique_node_count(),
    );

    Ok(DatasetSplit { full, train, valid, test, thresholds })
}
