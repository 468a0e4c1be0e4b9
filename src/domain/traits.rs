// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types,
// we can swap implementations without changing the code
// that uses them:
//   - JsonFeatureLoader implements FeatureSource
//   - A future binary/NPY loader could also implement it
//   - The application layer only sees FeatureSource
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sample::FeatureSample;

// ─── FeatureSource ────────────────────────────────────────────────────────────
/// Any component that can load the feature samples of one split.
///
/// Implementations:
///   - JsonFeatureLoader → reads a JSON array of labelled vectors
pub trait FeatureSource {
    /// Load every sample of the split.
    /// All returned samples must share the same feature dimension.
    fn load_all(&self) -> Result<Vec<FeatureSample>>;
}
