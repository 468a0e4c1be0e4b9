// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full meta-training pipeline in order:
//
//   Step 1: Load training features       (Layer 4 - data)
//   Step 2: Resolve the validation split (Layer 4 - data)
//   Step 3: Build datasets               (Layer 4 - data)
//   Step 4: Save resolved config         (Layer 6 - infra)
//   Step 5: Run the training loop        (Layer 5 - ml)

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{dataset::FeatureDataset, loader::JsonFeatureLoader, splitter::split_train_val};
use crate::domain::traits::FeatureSource;
use crate::infra::{checkpoint::CheckpointManager, config::Config};
use crate::ml::trainer::run_training;

/// Fraction of training samples kept for training when no
/// validation file is configured.
const FALLBACK_TRAIN_FRACTION: f64 = 0.9;

pub struct TrainUseCase {
    config: Config,
    resume: bool,
}

impl TrainUseCase {
    pub fn new(config: Config, resume: bool) -> Self {
        Self { config, resume }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load training features ────────────────────────────────────
        tracing::info!("Loading training features from '{}'", cfg.data.train_features);
        let train_samples = JsonFeatureLoader::new(&cfg.data.train_features).load_all()?;
        tracing::info!("Loaded {} training samples", train_samples.len());

        // ── Step 2: Resolve the validation split ──────────────────────────────
        // A dedicated file holds novel classes, which is what the
        // episodic protocol wants. The held-out slice fallback
        // reuses training classes and only gauges fit.
        let (train_samples, val_samples) = match &cfg.data.val_features {
            Some(path) => {
                tracing::info!("Loading validation features from '{}'", path);
                (train_samples, JsonFeatureLoader::new(path).load_all()?)
            }
            None => {
                tracing::warn!(
                    "No validation file configured — holding out {}% of the training split",
                    ((1.0 - FALLBACK_TRAIN_FRACTION) * 100.0) as usize,
                );
                let mut rng = StdRng::seed_from_u64(cfg.train.seed);
                split_train_val(train_samples, FALLBACK_TRAIN_FRACTION, &mut rng)
            }
        };
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len(),
        );

        // ── Step 3: Build datasets ────────────────────────────────────────────
        let train_dataset = FeatureDataset::new(train_samples);
        let val_dataset = FeatureDataset::new(val_samples);

        if train_dataset.feat_dim() != cfg.data.feat_dim {
            bail!(
                "training features have dim {} but config says data.feat_dim={}",
                train_dataset.feat_dim(),
                cfg.data.feat_dim,
            );
        }
        if val_dataset.feat_dim() != cfg.data.feat_dim {
            bail!(
                "validation features have dim {} but config says data.feat_dim={}",
                val_dataset.feat_dim(),
                cfg.data.feat_dim,
            );
        }
        if train_dataset.num_classes() != cfg.model.num_class {
            bail!(
                "training split has {} classes but config says model.num_class={}",
                train_dataset.num_classes(),
                cfg.model.num_class,
            );
        }

        // ── Step 4: Save resolved config for the test harness ─────────────────
        let ckpt = CheckpointManager::new(&cfg.train.result_dir);
        ckpt.save_config(cfg)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, train_dataset, val_dataset, ckpt, self.resume)?;

        Ok(())
    }
}
