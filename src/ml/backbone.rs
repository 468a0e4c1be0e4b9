// ============================================================
// Layer 5 — Embedding Network
// ============================================================
// Trainable embedding on top of the externally extracted
// features. The backbone itself (conv net over pixels) runs
// outside this crate; what remains here is an optional MLP
// projection trained jointly with the classifier head during
// meta-training and frozen during meta-testing.
//
// With no hidden layers the module is the identity and the
// loaded features flow straight into the classifier.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

#[derive(Config, Debug)]
pub struct EmbeddingNetConfig {
    /// Dimension of the features loaded from disk
    pub feat_dim: usize,

    /// Hidden layer widths; empty means identity
    pub hidden_dims: Vec<usize>,

    #[config(default = 0.0)]
    pub dropout: f64,
}

impl EmbeddingNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EmbeddingNet<B> {
        let mut layers = Vec::with_capacity(self.hidden_dims.len());
        let mut in_dim = self.feat_dim;
        for &out_dim in &self.hidden_dims {
            layers.push(LinearConfig::new(in_dim, out_dim).init(device));
            in_dim = out_dim;
        }
        EmbeddingNet {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            out_dim: in_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct EmbeddingNet<B: Backend> {
    layers:  Vec<Linear<B>>,
    dropout: Dropout,
    out_dim: usize,
}

impl<B: Backend> EmbeddingNet<B> {
    /// `[batch, feat_dim]` → `[batch, out_dim]`
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = features;
        for layer in &self.layers {
            x = self.dropout.forward(relu(layer.forward(x)));
        }
        x
    }

    /// Dimension the classifier head sees
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }
}
