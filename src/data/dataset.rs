use burn::data::dataset::Dataset;
use std::collections::BTreeMap;

use crate::domain::sample::FeatureSample;

/// A split of labelled feature vectors. Implements Burn's
/// Dataset trait for the meta-training DataLoader and keeps a
/// class → sample-index map for the episode sampler.
pub struct FeatureDataset {
    samples:  Vec<FeatureSample>,
    by_class: BTreeMap<usize, Vec<usize>>,
    dim:      usize,
}

impl FeatureDataset {
    pub fn new(samples: Vec<FeatureSample>) -> Self {
        let dim = samples.first().map(FeatureSample::dim).unwrap_or(0);
        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, sample) in samples.iter().enumerate() {
            by_class.entry(sample.label).or_default().push(index);
        }
        Self { samples, by_class, dim }
    }

    /// Feature dimension shared by every sample
    pub fn feat_dim(&self) -> usize {
        self.dim
    }

    /// Distinct class labels, ascending
    pub fn classes(&self) -> Vec<usize> {
        self.by_class.keys().copied().collect()
    }

    pub fn num_classes(&self) -> usize {
        self.by_class.len()
    }

    /// Indices of all samples of one class
    pub fn samples_of(&self, class: usize) -> &[usize] {
        self.by_class.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_ref(&self, index: usize) -> &FeatureSample {
        &self.samples[index]
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<FeatureSample> for FeatureDataset {
    fn get(&self, index: usize) -> Option<FeatureSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_index() {
        let dataset = FeatureDataset::new(vec![
            FeatureSample::new(2, vec![0.0, 1.0]),
            FeatureSample::new(0, vec![1.0, 0.0]),
            FeatureSample::new(2, vec![0.5, 0.5]),
        ]);
        assert_eq!(dataset.feat_dim(), 2);
        assert_eq!(dataset.classes(), vec![0, 2]);
        assert_eq!(dataset.samples_of(2), &[0, 2]);
        assert_eq!(dataset.samples_of(7), &[] as &[usize]);
        assert_eq!(dataset.len(), 3);
    }
}
