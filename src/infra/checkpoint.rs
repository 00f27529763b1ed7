// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved per checkpoint directory:
//   1. model_epoch_N (.mpk.gz)  — all learned parameters
//   2. latest_epoch.json        — which epoch was last saved
//   3. train_config.json        — architecture + dimensions
//   4. vocab.json               — written by VocabStore
//
// The config is saved separately because loading for
// generation must rebuild the exact architecture (variant,
// d_model, layer count, vocabulary size) before the weights
// can be poured back in. CompactRecorder is type-safe: loading
// fails if the rebuilt architecture doesn't match the record.
//
// The manager is generic over the module so both architectures
// share one persistence path.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use burn::{
    module::Module,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory
    /// if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save model weights for a given epoch and advance the
    /// latest-epoch pointer.
    pub fn save_model<B, M>(&self, model: &M, epoch: usize) -> Result<()>
    where
        B: AutodiffBackend,
        M: Module<B>,
    {
        // Recorder adds the file extension itself
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest saved weights into a freshly initialized
    /// model of the same architecture.
    pub fn load_model<B, M>(&self, model: M, device: &B::Device) -> Result<M>
    where
        B: Backend,
        M: Module<B>,
    {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Save the training configuration so generation can rebuild
    /// the exact model. Must be called before training starts.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration back.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'generate'.",
                path.display()
            )
        })?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Read latest_epoch.json and return the epoch number.
    fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{AttentionModel, AttentionModelConfig, SequenceModel};
    use crate::ml::trainer::TrainBackend;

    #[test]
    fn test_save_then_load_restores_identical_logits() {
        let dir = std::env::temp_dir().join(format!("cadenza-ckpt-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let manager = CheckpointManager::new(dir.to_string_lossy().into_owned());

        let device = Default::default();
        let cfg = AttentionModelConfig::new(10, 4, 8, 2, 1, 16, 0.0);
        let trained: AttentionModel<TrainBackend> = cfg.init(&device);
        manager.save_model(&trained, 1).unwrap();

        // A fresh init has different weights until the record is loaded
        let fresh: AttentionModel<TrainBackend> = cfg.init(&device);
        let restored = manager.load_model(fresh, &device).unwrap();

        let probe = Tensor::<TrainBackend, 1, Int>::from_ints([2, 4, 5].as_slice(), &device)
            .unsqueeze::<2>();
        assert_eq!(
            trained.forward(probe.clone()).into_data(),
            restored.forward(probe).into_data(),
        );

        fs::remove_dir_all(&dir).ok();
    }
}
