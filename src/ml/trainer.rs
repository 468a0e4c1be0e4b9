// ============================================================
// Layer 5 — Meta-Training Loop
// ============================================================
// Trains the global NegNet (embedding + margin classifier over
// all training classes) with the warmup schedule, validating
// after every epoch on held-out classes via episodic
// fine-tuning — the same procedure the test harness runs.
//
// Per epoch:
//   1. read the scheduler's rate
//   2. one pass over the training batches (margin CE, backward,
//      optimizer step at that rate)
//   3. val_episode episodes on the validation split
//   4. metrics row + checkpoint (+ best model on improvement)
//   5. step the scheduler
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{momentum::MomentumConfig, AdamConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{
    batcher::FeatureBatcher,
    dataset::FeatureDataset,
    episode_sampler::EpisodeSampler,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::config::{Config, OptimKind};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{accuracy, NegNet, NegNetConfig};
use crate::ml::scheduler::GradualWarmupScheduler;
use crate::ml::tester::{evaluate_episodes, mean_confidence};
use crate::ml::{InferBackend, TrainBackend};

/// Model geometry from the experiment config.
pub fn build_net_config(cfg: &Config) -> NegNetConfig {
    NegNetConfig::new(
        cfg.data.feat_dim,
        cfg.model.num_class,
        cfg.model.embedding.hidden_dims.clone(),
    )
    .with_dropout(cfg.model.embedding.dropout)
    .with_margin(cfg.model.margin)
    .with_scale_factor(cfg.model.scale_factor)
}

pub fn run_training(
    cfg:           &Config,
    train_dataset: FeatureDataset,
    val_dataset:   FeatureDataset,
    ckpt:          CheckpointManager,
    resume:        bool,
) -> Result<()> {
    let device = <InferBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);

    let mut model: NegNet<TrainBackend> = build_net_config(cfg).init(&device);
    tracing::info!(
        "Model ready: feat_dim={}, num_class={}, margin={}",
        cfg.data.feat_dim,
        cfg.model.num_class,
        cfg.model.margin,
    );

    let mut scheduler = GradualWarmupScheduler::new(
        cfg.optim.lr,
        cfg.optim.scheduler.multiplier,
        cfg.optim.scheduler.warmup_epoch,
        cfg.optim.scheduler.after.clone(),
    )?;

    let mut start_epoch = 1;
    if resume && ckpt.has_checkpoint() {
        model = ckpt.load_model(model, &device)?;
        scheduler = ckpt.load_scheduler()?;
        start_epoch = ckpt.latest_epoch()? + 1;
        tracing::info!("Resuming training from epoch {}", start_epoch);
    }

    match cfg.optim.kind {
        OptimKind::Sgd => {
            let momentum = (cfg.optim.momentum > 0.0)
                .then(|| MomentumConfig::new().with_momentum(cfg.optim.momentum));
            let optim = SgdConfig::new().with_momentum(momentum).init();
            train_loop(cfg, model, optim, scheduler, train_dataset, val_dataset, ckpt, start_epoch, &device)
        }
        OptimKind::Adam => {
            let optim = AdamConfig::new().with_epsilon(1e-8).init();
            train_loop(cfg, model, optim, scheduler, train_dataset, val_dataset, ckpt, start_epoch, &device)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn train_loop<O>(
    cfg:           &Config,
    mut model:     NegNet<TrainBackend>,
    mut optim:     O,
    mut scheduler: GradualWarmupScheduler,
    train_dataset: FeatureDataset,
    val_dataset:   FeatureDataset,
    ckpt:          CheckpointManager,
    start_epoch:   usize,
    device:        &<InferBackend as Backend>::Device,
) -> Result<()>
where
    O: Optimizer<NegNet<TrainBackend>, TrainBackend>,
{
    let metrics = MetricsLogger::new(ckpt.dir().clone())?;

    let train_batcher = FeatureBatcher::<TrainBackend>::new(device.clone());
    let train_loader = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.train.batch_size)
        .shuffle(cfg.train.seed)
        .num_workers(1)
        .build(train_dataset);

    let mut best_val_acc = f64::NEG_INFINITY;

    for epoch in start_epoch..=cfg.train.epochs {
        let lr = scheduler.lr();

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;
        let mut correct_weighted = 0.0f64;
        let mut seen = 0usize;

        for batch in train_loader.iter() {
            let batch_size = batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.features, batch.targets.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches += 1;
            correct_weighted += accuracy(logits, batch.targets) * batch_size as f64;
            seen += batch_size;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let train_acc = if seen > 0 { correct_weighted / seen as f64 } else { 0.0 };

        // ── Episodic validation ───────────────────────────────────────────────
        // The frozen model evaluates exactly the way `test` does;
        // a per-epoch seed keeps validation episodes fresh but
        // reproducible.
        let model_valid = model.valid();
        let episode_seed = cfg.train.seed.wrapping_add(epoch as u64);
        let mut sampler = EpisodeSampler::new(
            cfg.episode.way,
            cfg.episode.shot,
            cfg.episode.query_num,
            episode_seed,
        );
        let mut rng = StdRng::seed_from_u64(episode_seed);
        let accs = evaluate_episodes(
            &model_valid,
            &val_dataset,
            &mut sampler,
            cfg.episode.val_episode,
            &cfg.inner,
            &mut rng,
            device,
        )?;
        let (val_acc, val_ci) = mean_confidence(&accs);

        println!(
            "Epoch {:>3}/{} | lr={:.5} | train_loss={:.4} | train_acc={:.1}% | val_acc={:.2}% ± {:.2}%",
            epoch,
            cfg.train.epochs,
            lr,
            train_loss,
            train_acc * 100.0,
            val_acc * 100.0,
            val_ci * 100.0,
        );

        // ── Bookkeeping ───────────────────────────────────────────────────────
        let row = EpochMetrics::new(epoch, lr, train_loss, train_acc, val_acc);
        metrics.log(&row)?;

        ckpt.save_model(&model, epoch)?;
        ckpt.save_scheduler(&scheduler)?;
        if row.is_improvement(best_val_acc) {
            best_val_acc = val_acc;
            ckpt.save_best_model(&model)?;
            tracing::info!("New best val accuracy: {:.2}%", val_acc * 100.0);
        }

        scheduler.step();
    }

    tracing::info!("Training complete, best val accuracy {:.2}%", best_val_acc * 100.0);
    Ok(())
}
