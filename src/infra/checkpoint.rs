// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// One result directory per training run:
//
//   results/<run>/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     ...
//     model_best.mpk.gz      ← weights at the best val accuracy
//     latest_epoch.json      ← number of the last saved epoch
//     scheduler_state.json   ← warmup scheduler (nested schedule
//                              included), for exact resume
//     config.yaml            ← resolved config, read by `test`
//     metrics.csv            ← written by the metrics logger
//
// Weights go through Burn's CompactRecorder (MessagePack +
// gzip); loading fails if the architecture doesn't match, so
// the config must be saved before training starts.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::{fs, path::PathBuf};

use crate::infra::config::Config;
use crate::ml::model::NegNet;
use crate::ml::scheduler::GradualWarmupScheduler;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager rooted at the result directory,
    /// creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Save model weights for a given epoch and update the
    /// latest-epoch pointer.
    pub fn save_model<B: AutodiffBackend>(&self, model: &NegNet<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .context("failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Save the current weights as the best-so-far model.
    pub fn save_best_model<B: AutodiffBackend>(&self, model: &NegNet<B>) -> Result<()> {
        let path = self.dir.join("model_best");
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("failed to save best model to '{}'", path.display()))?;
        tracing::debug!("Saved best model");
        Ok(())
    }

    /// Load weights from the latest epoch checkpoint into a
    /// freshly built model of the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  NegNet<B>,
        device: &B::Device,
    ) -> Result<NegNet<B>> {
        let epoch = self.latest_epoch()?;
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);
        let record = CompactRecorder::new().load(path.clone(), device).with_context(|| {
            format!(
                "cannot load checkpoint '{}' — has training been run?",
                path.display(),
            )
        })?;
        Ok(model.load_record(record))
    }

    /// Load the best-accuracy weights, falling back to the
    /// latest epoch when no best model was recorded.
    pub fn load_best_model<B: Backend>(
        &self,
        model:  NegNet<B>,
        device: &B::Device,
    ) -> Result<NegNet<B>> {
        let path = self.dir.join("model_best");
        if !self.dir.join("model_best.mpk.gz").exists() {
            tracing::warn!("No best model recorded, falling back to latest epoch");
            return self.load_model(model, device);
        }

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("cannot load best model '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    /// Persist the scheduler, nested schedule state included.
    pub fn save_scheduler(&self, scheduler: &GradualWarmupScheduler) -> Result<()> {
        let path = self.dir.join("scheduler_state.json");
        fs::write(&path, serde_json::to_string_pretty(scheduler)?)
            .with_context(|| format!("cannot write scheduler state to '{}'", path.display()))?;
        Ok(())
    }

    /// Restore the scheduler exactly as it was saved.
    pub fn load_scheduler(&self) -> Result<GradualWarmupScheduler> {
        let path = self.dir.join("scheduler_state.json");
        let text = fs::read_to_string(&path)
            .with_context(|| format!("cannot read scheduler state from '{}'", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Copy the resolved config into the result directory so
    /// `test` can rebuild the exact model later.
    pub fn save_config(&self, cfg: &Config) -> Result<()> {
        let path = self.dir.join("config.yaml");
        fs::write(&path, cfg.to_yaml()?)
            .with_context(|| format!("cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved resolved config to '{}'", path.display());
        Ok(())
    }

    /// Read the resolved config back, applying overrides on top.
    pub fn load_config(&self, overrides: &[(String, String)]) -> Result<Config> {
        let path = self.dir.join("config.yaml");
        Config::from_yaml_with_overrides(&path, overrides).with_context(|| {
            format!(
                "cannot read config from '{}' — was this directory produced by 'train'?",
                path.display(),
            )
        })
    }

    /// Number of the last saved epoch.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s = fs::read_to_string(&path)
            .context("cannot find 'latest_epoch.json' — has training been run?")?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    /// Whether this directory holds a resumable run.
    pub fn has_checkpoint(&self) -> bool {
        self.dir.join("latest_epoch.json").exists()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::scheduler::DecaySchedule;

    #[test]
    fn test_scheduler_state_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        let mut sched = GradualWarmupScheduler::new(
            0.1,
            2.0,
            5,
            DecaySchedule::MultiStep { milestones: vec![30, 60], gamma: 0.1 },
        )
        .unwrap();
        sched.step();
        sched.step();

        ckpt.save_scheduler(&sched).unwrap();
        let restored = ckpt.load_scheduler().unwrap();
        assert_eq!(restored, sched);
    }

    #[test]
    fn test_latest_epoch_missing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert!(!ckpt.has_checkpoint());
        assert!(ckpt.latest_epoch().is_err());
    }
}
