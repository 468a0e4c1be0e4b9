// ============================================================
// Layer 5 — Episodic Test Harness
// ============================================================
// Loads the best checkpoint, then for every test episode:
// embed support and query with the frozen model, fine-tune a
// fresh classifier head on the support set, score the query
// set. Accuracies aggregate to mean ± 95% confidence interval,
// which is the number few-shot papers report.

use anyhow::Result;
use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{
    batcher::stack_samples,
    dataset::FeatureDataset,
    episode_sampler::EpisodeSampler,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::config::{Config, InnerLoopSettings};
use crate::ml::model::{accuracy, adapt_to_episode, NegNet};
use crate::ml::trainer::build_net_config;
use crate::ml::{InferBackend, TrainBackend};

/// Run the full test loop; returns the mean episode accuracy.
pub fn run_test(
    cfg:          &Config,
    test_dataset: FeatureDataset,
    ckpt:         &CheckpointManager,
) -> Result<f64> {
    let device = <InferBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);

    let model: NegNet<InferBackend> = build_net_config(cfg).init(&device);
    let model = ckpt.load_best_model(model, &device)?;

    let episodes = cfg.episode.test_episode;
    let mut sampler = EpisodeSampler::new(
        cfg.episode.way,
        cfg.episode.shot,
        cfg.episode.query_num,
        cfg.train.seed,
    );
    let mut rng = StdRng::seed_from_u64(cfg.train.seed);

    tracing::info!(
        "Testing: {} episodes of {}-way {}-shot",
        episodes,
        cfg.episode.way,
        cfg.episode.shot,
    );

    let accs = evaluate_episodes(
        &model,
        &test_dataset,
        &mut sampler,
        episodes,
        &cfg.inner,
        &mut rng,
        &device,
    )?;

    let (mean, ci) = mean_confidence(&accs);
    println!(
        "Test accuracy over {} episodes: {:.2}% ± {:.2}%",
        accs.len(),
        mean * 100.0,
        ci * 100.0,
    );
    Ok(mean)
}

/// Evaluate `episodes` episodes with per-episode fine-tuning.
/// The embedding stays frozen: support/query are embedded on
/// the inference backend, then moved to the autodiff backend as
/// constants so only the fresh classifier trains.
pub fn evaluate_episodes(
    model:    &NegNet<InferBackend>,
    dataset:  &FeatureDataset,
    sampler:  &mut EpisodeSampler,
    episodes: usize,
    inner:    &InnerLoopSettings,
    rng:      &mut StdRng,
    device:   &<InferBackend as Backend>::Device,
) -> Result<Vec<f64>> {
    let mut accs = Vec::with_capacity(episodes);

    for index in 0..episodes {
        let episode = sampler.sample(dataset)?;

        let (support, support_targets) = stack_samples::<InferBackend>(&episode.support, device);
        let (query, query_targets) = stack_samples::<InferBackend>(&episode.query, device);

        let support_emb = to_autodiff(model.embed(support), device);
        let query_emb = to_autodiff(model.embed(query), device);
        let support_targets = to_autodiff_int(support_targets, device);
        let query_targets = to_autodiff_int(query_targets, device);

        let logits = adapt_to_episode(support_emb, support_targets, query_emb, episode.way, inner, rng);
        let acc = accuracy(logits, query_targets);
        accs.push(acc);

        if (index + 1) % 100 == 0 {
            let (mean, ci) = mean_confidence(&accs);
            tracing::info!(
                "Episode {:>4}/{}: running accuracy {:.2}% ± {:.2}%",
                index + 1,
                episodes,
                mean * 100.0,
                ci * 100.0,
            );
        }
    }

    Ok(accs)
}

fn to_autodiff(
    tensor: Tensor<InferBackend, 2>,
    device: &<InferBackend as Backend>::Device,
) -> Tensor<TrainBackend, 2> {
    Tensor::from_data(tensor.into_data(), device)
}

fn to_autodiff_int(
    tensor: Tensor<InferBackend, 1, Int>,
    device: &<InferBackend as Backend>::Device,
) -> Tensor<TrainBackend, 1, Int> {
    Tensor::from_data(tensor.into_data(), device)
}

/// Mean and 95% confidence half-width (1.96 σ/√n).
pub fn mean_confidence(accs: &[f64]) -> (f64, f64) {
    if accs.is_empty() {
        return (0.0, 0.0);
    }
    let n = accs.len() as f64;
    let mean = accs.iter().sum::<f64>() / n;
    let var = accs.iter().map(|a| (a - mean) * (a - mean)).sum::<f64>() / n;
    let ci = 1.96 * var.sqrt() / n.sqrt();
    (mean, ci)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_confidence_constant_series() {
        let (mean, ci) = mean_confidence(&[0.8, 0.8, 0.8, 0.8]);
        assert!((mean - 0.8).abs() < 1e-12);
        assert!(ci.abs() < 1e-12);
    }

    #[test]
    fn test_mean_confidence_shrinks_with_n() {
        let few: Vec<f64> = (0..10).map(|i| 0.5 + 0.01 * (i % 2) as f64).collect();
        let many: Vec<f64> = (0..1000).map(|i| 0.5 + 0.01 * (i % 2) as f64).collect();
        let (_, ci_few) = mean_confidence(&few);
        let (_, ci_many) = mean_confidence(&many);
        assert!(ci_many < ci_few);
    }

    #[test]
    fn test_mean_confidence_empty() {
        assert_eq!(mean_confidence(&[]), (0.0, 0.0));
    }
}
