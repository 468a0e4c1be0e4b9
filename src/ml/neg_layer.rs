// ============================================================
// Layer 5 — NegLayer (margin classifier head)
// ============================================================
// Cosine-similarity classifier with an additive margin on the
// true-class logit:
//
//   cosine = normalize(feature) · normalize(weight)
//   logits = scale_factor * (cosine - margin * onehot(target))
//
// At inference no targets are passed and the margin never
// applies. A negative margin *raises* the true-class logit,
// widening the decision boundary for transfer to novel classes.
//
// Reference: Liu et al. (2020) Negative Margin Matters:
//            Understanding Margin in Few-shot Classification

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct NegLayerConfig {
    pub in_features:  usize,
    pub out_features: usize,

    /// Subtracted from the true-class cosine before scaling
    #[config(default = -0.3)]
    pub margin: f64,

    /// Multiplier applied to all logits after the margin
    #[config(default = 30.0)]
    pub scale_factor: f64,
}

impl NegLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> NegLayer<B> {
        // Linear's default Kaiming-uniform init; the bias has no
        // meaning under cosine similarity.
        let linear = LinearConfig::new(self.in_features, self.out_features)
            .with_bias(false)
            .init(device);
        NegLayer {
            linear,
            margin: self.margin,
            scale_factor: self.scale_factor,
        }
    }
}

#[derive(Module, Debug)]
pub struct NegLayer<B: Backend> {
    pub linear:       Linear<B>,
    pub margin:       f64,
    pub scale_factor: f64,
}

impl<B: Backend> NegLayer<B> {
    /// Scaled cosine similarities — inference path, no margin.
    /// Input `[batch, in_features]` → output `[batch, out_features]`.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.cosine(features).mul_scalar(self.scale_factor)
    }

    /// Training path: subtract the margin from exactly the
    /// true-class logit of each row, then scale.
    pub fn forward_with_targets(
        &self,
        features: Tensor<B, 2>,
        targets:  Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let cosine = self.cosine(features);
        let num_classes = cosine.dims()[1];
        let mask = one_hot(targets, num_classes);
        cosine
            .sub(mask.mul_scalar(self.margin))
            .mul_scalar(self.scale_factor)
    }

    /// Cosine similarity between L2-normalized feature rows and
    /// L2-normalized per-class weight columns, in [-1, 1].
    fn cosine(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        // Linear stores its weight as [in_features, out_features],
        // one column per class.
        let weight = self.linear.weight.val();
        l2_normalize_rows(features).matmul(l2_normalize_cols(weight))
    }
}

fn l2_normalize_rows<B: Backend>(t: Tensor<B, 2>) -> Tensor<B, 2> {
    let norm = t.clone().powf_scalar(2.0).sum_dim(1).sqrt().clamp_min(1e-12);
    t.div(norm)
}

fn l2_normalize_cols<B: Backend>(t: Tensor<B, 2>) -> Tensor<B, 2> {
    let norm = t.clone().powf_scalar(2.0).sum_dim(0).sqrt().clamp_min(1e-12);
    t.div(norm)
}

/// One-hot float mask from integer targets, `[batch, num_classes]`.
fn one_hot<B: Backend>(targets: Tensor<B, 1, Int>, num_classes: usize) -> Tensor<B, 2> {
    let device = targets.device();
    let [batch_size] = targets.dims();
    let indices = targets.reshape([batch_size, 1]);
    Tensor::<B, 2>::zeros([batch_size, num_classes], &device).scatter(
        1,
        indices,
        Tensor::<B, 2>::ones([batch_size, 1], &device),
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    fn feature_batch(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2> {
        Tensor::from_floats(
            [
                [0.5, -1.0, 2.0, 0.0],
                [3.0, 0.25, -0.5, 1.0],
                [-2.0, 1.5, 0.75, -0.25],
            ],
            device,
        )
    }

    #[test]
    fn test_cosine_lies_in_unit_interval() {
        let device = device();
        let layer = NegLayerConfig::new(4, 6).init::<TestBackend>(&device);

        let logits = layer.forward(feature_batch(&device));
        let values: Vec<f32> = logits
            .div_scalar(layer.scale_factor)
            .into_data()
            .to_vec()
            .unwrap();
        assert!(values.iter().all(|&v| (-1.0 - 1e-5..=1.0 + 1e-5).contains(&(v as f64))));
    }

    #[test]
    fn test_margin_hits_exactly_the_true_class_logit() {
        let device = device();
        let layer = NegLayerConfig::new(4, 6)
            .with_margin(0.4)
            .with_scale_factor(30.0)
            .init::<TestBackend>(&device);

        let features = feature_batch(&device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([2, 0, 5], &device);

        let plain: Vec<f32> = layer
            .forward(features.clone())
            .into_data()
            .to_vec()
            .unwrap();
        let margined: Vec<f32> = layer
            .forward_with_targets(features, targets)
            .into_data()
            .to_vec()
            .unwrap();

        let num_classes = 6;
        let true_class = [2usize, 0, 5];
        for row in 0..3 {
            for class in 0..num_classes {
                let diff = plain[row * num_classes + class] - margined[row * num_classes + class];
                if class == true_class[row] {
                    // margin * scale_factor = 0.4 * 30 = 12
                    assert!((diff - 12.0).abs() < 1e-3, "row {row}: diff {diff}");
                } else {
                    assert!(diff.abs() < 1e-4, "row {row} class {class}: diff {diff}");
                }
            }
        }
    }

    #[test]
    fn test_matching_weight_column_is_the_maximal_logit() {
        let device = device();
        let layer = NegLayerConfig::new(5, 3)
            .with_scale_factor(10.0)
            .init::<TestBackend>(&device);

        // Use class 1's own weight column as the input feature:
        // cosine with itself is 1, so its logit is the scale factor
        // and no other class can beat it.
        let weight = layer.linear.weight.val();
        let [in_features, _] = weight.dims();
        let feature = weight.slice([0..in_features, 1..2]).reshape([1, in_features]);

        let logits: Vec<f32> = layer.forward(feature).into_data().to_vec().unwrap();
        assert!((logits[1] - 10.0).abs() < 1e-4);
        assert!(logits[0] < logits[1] && logits[2] < logits[1]);
    }
}
