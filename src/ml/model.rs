// ============================================================
// Layer 5 — NegNet (meta-classifier)
// ============================================================
// Meta-training path: embed a batch of features, run the global
// NegLayer with margin applied, take cross-entropy loss against
// the global class labels.
//
// Meta-testing path: per episode, fit a FRESH NegLayer on the
// embedded support set (margin cross-entropy, mini-batches in a
// new random order each pass) and score the query set with it —
// no margin at query time since no targets are passed.

use burn::{
    nn::loss::CrossEntropyLossConfig,
    optim::{momentum::MomentumConfig, AdamConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, seq::SliceRandom};

use crate::infra::config::{InnerLoopSettings, OptimKind};
use crate::ml::backbone::{EmbeddingNet, EmbeddingNetConfig};
use crate::ml::neg_layer::{NegLayer, NegLayerConfig};

#[derive(Config, Debug)]
pub struct NegNetConfig {
    pub feat_dim:    usize,
    pub num_class:   usize,
    pub hidden_dims: Vec<usize>,

    #[config(default = 0.0)]
    pub dropout: f64,

    #[config(default = -0.3)]
    pub margin: f64,

    #[config(default = 30.0)]
    pub scale_factor: f64,
}

impl NegNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> NegNet<B> {
        let embedding = EmbeddingNetConfig::new(self.feat_dim, self.hidden_dims.clone())
            .with_dropout(self.dropout)
            .init(device);
        let classifier = NegLayerConfig::new(embedding.out_dim(), self.num_class)
            .with_margin(self.margin)
            .with_scale_factor(self.scale_factor)
            .init(device);
        NegNet { embedding, classifier }
    }
}

#[derive(Module, Debug)]
pub struct NegNet<B: Backend> {
    pub embedding:  EmbeddingNet<B>,
    pub classifier: NegLayer<B>,
}

impl<B: Backend> NegNet<B> {
    /// Embedding only — the meta-testing path embeds support and
    /// query once, then fine-tunes a fresh head on the result.
    pub fn embed(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.embedding.forward(features)
    }

    /// Unmargined scaled cosine logits over the global classes.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.classifier.forward(self.embed(features))
    }

    /// Margined logits + cross-entropy loss — the meta-training
    /// objective.
    pub fn forward_loss(
        &self,
        features: Tensor<B, 2>,
        targets:  Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self
            .classifier
            .forward_with_targets(self.embed(features), targets.clone());
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}

/// Fraction of rows whose argmax matches the target.
pub fn accuracy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64 {
    let total = targets.dims()[0];
    if total == 0 {
        return 0.0;
    }
    // argmax(1) returns [batch, 1] — squeeze before comparing
    let preds = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = preds.equal(targets).int().sum().into_scalar().elem::<i64>();
    correct as f64 / total as f64
}

/// Fit a fresh episode classifier on the (already embedded,
/// detached) support set, then return its logits on the query
/// set. Labels must already be remapped to `[0, way)`.
pub fn adapt_to_episode<B: AutodiffBackend>(
    support_feat:    Tensor<B, 2>,
    support_targets: Tensor<B, 1, Int>,
    query_feat:      Tensor<B, 2>,
    way:             usize,
    inner:           &InnerLoopSettings,
    rng:             &mut StdRng,
) -> Tensor<B, 2> {
    let device = support_feat.device();
    let feat_dim = support_feat.dims()[1];

    let classifier = NegLayerConfig::new(feat_dim, way)
        .with_margin(inner.margin)
        .with_scale_factor(inner.scale_factor)
        .init::<B>(&device);

    let classifier = match inner.optim.kind {
        OptimKind::Sgd => {
            let momentum = (inner.optim.momentum > 0.0)
                .then(|| MomentumConfig::new().with_momentum(inner.optim.momentum));
            let optim = SgdConfig::new().with_momentum(momentum).init();
            fit_classifier(classifier, optim, &support_feat, &support_targets, inner, rng)
        }
        OptimKind::Adam => {
            let optim = AdamConfig::new().init();
            fit_classifier(classifier, optim, &support_feat, &support_targets, inner, rng)
        }
    };

    classifier.forward(query_feat)
}

fn fit_classifier<B, O>(
    mut classifier:  NegLayer<B>,
    mut optim:       O,
    support_feat:    &Tensor<B, 2>,
    support_targets: &Tensor<B, 1, Int>,
    inner:           &InnerLoopSettings,
    rng:             &mut StdRng,
) -> NegLayer<B>
where
    B: AutodiffBackend,
    O: Optimizer<NegLayer<B>, B>,
{
    let device = support_feat.device();
    let support_size = support_feat.dims()[0];
    let batch_size = inner.batch_size.min(support_size).max(1);
    let loss_fn = CrossEntropyLossConfig::new().init(&device);

    let mut order: Vec<usize> = (0..support_size).collect();
    for _pass in 0..inner.train_iter {
        // Fresh support order each pass
        order.shuffle(rng);

        for chunk in order.chunks(batch_size) {
            let idx: Vec<i32> = chunk.iter().map(|&i| i as i32).collect();
            let idx = Tensor::<B, 1, Int>::from_ints(idx.as_slice(), &device);

            let batch = support_feat.clone().select(0, idx.clone());
            let targets = support_targets.clone().select(0, idx);

            let logits = classifier.forward_with_targets(batch, targets.clone());
            let loss = loss_fn.forward(logits, targets);

            let grads = GradientsParams::from_grads(loss.backward(), &classifier);
            classifier = optim.step(inner.optim.lr, classifier, grads);
        }
    }

    classifier
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::OptimizerSpec;
    use rand::SeedableRng;

    type TestBackend = burn::backend::NdArray;
    type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

    #[test]
    fn test_accuracy_counts_argmax_matches() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[5.0, 1.0, 0.0], [0.0, 2.0, 9.0], [3.0, 8.0, 1.0], [7.0, 0.0, 2.0]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 2, 0, 0], &device);
        // rows 0, 1, 3 correct; row 2 predicted class 1, target 0
        assert!((accuracy(logits, targets) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_forward_loss_shapes() {
        let device = Default::default();
        let model = NegNetConfig::new(4, 3, Vec::new()).init::<TestBackend>(&device);
        let features = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device);
        let (loss, logits) = model.forward_loss(features, targets);
        assert_eq!(logits.dims(), [2, 3]);
        assert_eq!(loss.dims(), [1]);
    }

    #[test]
    fn test_adaptation_separates_orthogonal_clusters() {
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(7);

        // Two classes living on orthogonal axes; a handful of
        // inner passes must classify held-out queries perfectly.
        let support = Tensor::<TestAutodiffBackend, 2>::from_floats(
            [
                [1.0, 0.05, 0.0, 0.0],
                [0.9, -0.03, 0.02, 0.0],
                [1.1, 0.0, -0.04, 0.01],
                [0.95, 0.02, 0.0, -0.02],
                [0.0, 0.03, 1.0, 0.05],
                [0.02, 0.0, 0.9, -0.03],
                [-0.01, 0.02, 1.1, 0.0],
                [0.0, -0.02, 0.95, 0.02],
            ],
            &device,
        );
        let support_targets =
            Tensor::<TestAutodiffBackend, 1, Int>::from_ints([0, 0, 0, 0, 1, 1, 1, 1], &device);
        let query = Tensor::<TestAutodiffBackend, 2>::from_floats(
            [
                [1.0, 0.0, 0.05, 0.0],
                [0.98, 0.01, -0.02, 0.03],
                [0.05, 0.0, 1.0, 0.0],
                [-0.02, 0.03, 0.97, 0.01],
            ],
            &device,
        );
        let query_targets =
            Tensor::<TestAutodiffBackend, 1, Int>::from_ints([0, 0, 1, 1], &device);

        let inner = InnerLoopSettings {
            margin:       -0.3,
            scale_factor: 10.0,
            train_iter:   30,
            batch_size:   4,
            optim:        OptimizerSpec { kind: OptimKind::Sgd, lr: 0.5, momentum: 0.9 },
        };

        let logits = adapt_to_episode(support, support_targets, query, 2, &inner, &mut rng);
        assert_eq!(logits.dims(), [4, 2]);
        assert!((accuracy(logits, query_targets) - 1.0).abs() < 1e-9);
    }
}
