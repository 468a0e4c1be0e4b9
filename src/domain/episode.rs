// ============================================================
// Layer 3 — Episode Domain Type
// ============================================================
// One few-shot task instance:
//   - `way` classes drawn from the split
//   - `shot` labelled support samples per class
//   - `query_num` evaluation samples per class
//
// Labels inside an episode are ALWAYS remapped to [0, way) —
// the per-episode classifier has exactly `way` outputs and
// never sees global class ids. Episodes are independent; no
// state is carried from one episode to the next.

use crate::domain::sample::FeatureSample;

/// Support and query sets for a single few-shot task.
#[derive(Debug, Clone)]
pub struct Episode {
    /// Number of classes in this episode
    pub way: usize,

    /// Labelled support samples per class
    pub shot: usize,

    /// Query samples per class
    pub query_num: usize,

    /// `way * shot` samples, labels in [0, way)
    pub support: Vec<FeatureSample>,

    /// `way * query_num` samples, labels in [0, way)
    pub query: Vec<FeatureSample>,
}

impl Episode {
    /// Total number of support samples (`way * shot`)
    pub fn support_size(&self) -> usize {
        self.way * self.shot
    }

    /// Total number of query samples (`way * query_num`)
    pub fn query_size(&self) -> usize {
        self.way * self.query_num
    }
}
