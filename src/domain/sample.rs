// ============================================================
// Layer 3 — FeatureSample Domain Type
// ============================================================
// One embedded image: a fixed-dimension feature vector produced
// by an external backbone, plus its integer class label.
// The crate never sees pixels — by the time a FeatureSample
// exists, the backbone has already run.

use serde::{Deserialize, Serialize};

/// A single labelled feature vector.
///
/// During meta-training `label` is a global class id over the
/// whole training split. Inside an episode, labels are remapped
/// to `[0, way)` before the sample reaches the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSample {
    /// Integer class id
    pub label: usize,

    /// Backbone output — same length for every sample in a split
    pub features: Vec<f32>,
}

impl FeatureSample {
    pub fn new(label: usize, features: Vec<f32>) -> Self {
        Self { label, features }
    }

    /// Dimension of the feature vector
    pub fn dim(&self) -> usize {
        self.features.len()
    }
}
