// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores module weights using Burn's CompactRecorder,
// plus the model hyperparameters as JSON so the same
// architecture can be rebuilt before the weights are loaded.
//
// File layout of one checkpoint directory:
//   <dir>/
//     caw_model.mpk         ← model weights
//     node_decoder.mpk      ← task head weights (node classification)
//     caw_config.json       ← model hyperparameters
//
// CompactRecorder stores half precision values, so restored
// weights match the saved ones to about three decimal digits.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Reads and writes checkpoint files inside one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the recorder writes for the record `name`.
    pub fn module_path<B: Backend>(&self, name: &str) -> PathBuf {
        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
        self.dir.join(format!("{name}.{ext}"))
    }

    /// True if a record called `name` was saved here.
    pub fn has_module<B: Backend>(&self, name: &str) -> bool {
        self.module_path::<B>(name).exists()
    }

    /// Write `module`'s parameters to `{dir}/{name}.mpk`.
    pub fn save_module<B: Backend, M: Module<B>>(&self, module: &M, name: &str) -> Result<()> {
        // The recorder adds the extension
        let path = self.dir.join(name);

        CompactRecorder::new()
            .record(module.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(())
    }

    /// Load the record `name` into `module`, which must have the
    /// architecture the record was saved from.
    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        module: M,
        name:   &str,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(name);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Was it saved first?", path.display())
            })?;

        tracing::debug!("Loaded checkpoint '{}'", path.display());
        Ok(module.load_record(record))
    }

    /// Write `cfg` as pretty JSON to `{dir}/{file}`.
    pub fn save_config<C: Serialize>(&self, cfg: &C, file: &str) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_config<C: DeserializeOwned>(&self, file: &str) -> Result<C> {
        let path = self.dir.join(file);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};
    use serial_test::serial;

    use crate::ml::model::CawConfig;

    type B = NdArray;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("ckpt")).unwrap();

        let cfg = CawConfig::new().with_n_layer(3).with_walk_pool("sum".to_string());
        manager.save_config(&cfg, "caw_config.json").unwrap();

        let loaded: CawConfig = manager.load_config("caw_config.json").unwrap();
        assert_eq!(loaded.n_layer, 3);
        assert_eq!(loaded.walk_pool, "sum");
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        assert!(!manager.has_module::<B>("caw_model"));
        assert!(manager.load_config::<CawConfig>("caw_config.json").is_err());
    }

    #[test]
    #[serial]
    fn test_saved_module_is_found_and_restored() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let saved: Linear<B> = LinearConfig::new(2, 2).init(&device);
        manager.save_module::<B, _>(&saved, "caw_model").unwrap();

        assert!(manager.has_module::<B>("caw_model"));
        assert!(manager.module_path::<B>("caw_model").exists());
        assert!(!manager.has_module::<B>("node_decoder"));

        let fresh: Linear<B> = LinearConfig::new(2, 2).init(&device);
        let restored = manager.load_module::<B, _>(fresh, "caw_model", &device).unwrap();

        let a = saved.weight.val().into_data().to_vec::<f32>().unwrap();
        let b = restored.weight.val().into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2, "{x} vs {y}");
        }
    }
}
