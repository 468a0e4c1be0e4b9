// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any one business
// layer:
//
//   config.rs     — YAML experiment configuration, literal
//                   key=value overrides, validation
//
//   checkpoint.rs — model weights via Burn's CompactRecorder,
//                   scheduler state and resolved config as
//                   sidecar files, latest/best bookkeeping
//
//   metrics.rs    — per-epoch metrics appended to a CSV for
//                   later analysis and plotting
//
// Reference: Burn Book §5 (Checkpointing)

/// Experiment configuration loading and validation
pub mod config;

/// Model/scheduler checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
