// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from feature files on disk to tensor batches.
//
// The pipeline flows in this order:
//
//   feature JSON files
//       │
//       ▼
//   JsonFeatureLoader → reads labelled feature vectors
//       │
//       ▼
//   FeatureDataset    → implements Burn's Dataset trait,
//       │               indexes samples by class
//       ▼
//   FeatureBatcher    → stacks samples into tensor batches
//       │               (meta-training, via the DataLoader)
//       ▼
//   EpisodeSampler    → draws way/shot/query episodes
//                       (meta-testing and validation)
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads labelled feature vectors from JSON files
pub mod loader;

/// Burn dataset over feature samples with a class index
pub mod dataset;

/// Stacks feature samples into tensor batches
pub mod batcher;

/// Draws few-shot episodes from a dataset
pub mod episode_sampler;

/// Shuffle-and-split fallback when no validation file exists
pub mod splitter;
