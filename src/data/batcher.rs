// ============================================================
// Layer 4 — Feature Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<FeatureSample>
// into tensors: features [batch, feat_dim] and integer targets
// [batch]. Also exposes the same stacking as a free function so
// the episodic path can build tensors without a DataLoader.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::sample::FeatureSample;

/// A batch of feature vectors ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct FeatureBatch<B: Backend> {
    /// Shape: [batch_size, feat_dim]
    pub features: Tensor<B, 2>,

    /// Shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Holds the target device so tensors land on the right
/// GPU/CPU — generic over the backend like the model itself.
#[derive(Clone, Debug)]
pub struct FeatureBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> FeatureBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<B, FeatureSample, FeatureBatch<B>> for FeatureBatcher<B> {
    fn batch(&self, items: Vec<FeatureSample>, _device: &B::Device) -> FeatureBatch<B> {
        let (features, targets) = stack_samples(&items, &self.device);
        FeatureBatch { features, targets }
    }
}

/// Flatten samples row-major and reshape into [batch, feat_dim];
/// labels become a 1D Int tensor.
pub fn stack_samples<B: Backend>(
    samples: &[FeatureSample],
    device:  &B::Device,
) -> (Tensor<B, 2>, Tensor<B, 1, Int>) {
    let batch_size = samples.len();
    let dim = samples.first().map(FeatureSample::dim).unwrap_or(0);

    let flat: Vec<f32> = samples.iter().flat_map(|s| s.features.iter().copied()).collect();
    let labels: Vec<i32> = samples.iter().map(|s| s.label as i32).collect();

    let features = Tensor::<B, 1>::from_floats(flat.as_slice(), device)
        .reshape([batch_size, dim]);
    let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

    (features, targets)
}
