// ============================================================
// Layer 2 — TestUseCase
// ============================================================
// Loads the resolved config and checkpoint from a result
// directory produced by `train`, then runs the episodic test
// loop on the test split.

use anyhow::{bail, Result};

use crate::data::{dataset::FeatureDataset, loader::JsonFeatureLoader};
use crate::domain::traits::FeatureSource;
use crate::infra::{checkpoint::CheckpointManager, config::Config};
use crate::ml::tester::run_test;

pub struct TestUseCase {
    config: Config,
    ckpt:   CheckpointManager,
}

impl TestUseCase {
    /// Read the config persisted at train time, with CLI
    /// overrides (e.g. a different episode count) on top.
    pub fn new(result_dir: String, overrides: &[(String, String)]) -> Result<Self> {
        let ckpt = CheckpointManager::new(&result_dir);
        let config = ckpt.load_config(overrides)?;
        Ok(Self { config, ckpt })
    }

    /// Run the test loop; returns the mean episode accuracy.
    pub fn execute(&self) -> Result<f64> {
        let cfg = &self.config;

        tracing::info!("Loading test features from '{}'", cfg.data.test_features);
        let samples = JsonFeatureLoader::new(&cfg.data.test_features).load_all()?;
        let test_dataset = FeatureDataset::new(samples);

        if test_dataset.feat_dim() != cfg.data.feat_dim {
            bail!(
                "test features have dim {} but config says data.feat_dim={}",
                test_dataset.feat_dim(),
                cfg.data.feat_dim,
            );
        }

        run_test(cfg, test_dataset, &self.ckpt)
    }
}
