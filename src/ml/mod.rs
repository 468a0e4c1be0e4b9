// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework specific code lives here. No other layer
// imports from burn directly except the data layer's tensor
// batching.
//
// What's in this layer:
//
//   neg_layer.rs — the margin cosine classifier head
//   backbone.rs  — optional trainable embedding over the
//                  externally extracted features
//   model.rs     — NegNet: meta-training objective and the
//                  per-episode fine-tuning loop
//   scheduler.rs — gradual warmup learning-rate schedule
//   trainer.rs   — meta-training loop with episodic validation
//   tester.rs    — episodic test harness with confidence
//                  intervals
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Liu et al. (2020) Negative Margin Matters

/// Margin cosine classifier head
pub mod neg_layer;

/// Trainable embedding network
pub mod backbone;

/// NegNet meta-classifier and episodic adaptation
pub mod model;

/// Gradual warmup learning-rate scheduler
pub mod scheduler;

/// Meta-training loop
pub mod trainer;

/// Episodic test harness
pub mod tester;

/// Inference/eval backend — CPU ndarray unless the `wgpu`
/// feature routes everything through the GPU.
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

/// Training backend: the inference backend wrapped in autodiff.
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
