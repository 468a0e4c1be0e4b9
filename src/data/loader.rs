// ============================================================
// Layer 4 — Feature Loader
// ============================================================
// Loads one split of pre-extracted features from a JSON file:
// an array of { "label": u, "features": [f32, ...] } records.
// The backbone that produced the vectors ran elsewhere; this
// loader only validates what it is given — a non-empty array
// with one consistent feature dimension.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::domain::sample::FeatureSample;
use crate::domain::traits::FeatureSource;

/// Loads all feature samples of one split from a JSON file.
/// Implements the FeatureSource trait from Layer 3.
pub struct JsonFeatureLoader {
    path: PathBuf,
}

impl JsonFeatureLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeatureSource for JsonFeatureLoader {
    fn load_all(&self) -> Result<Vec<FeatureSample>> {
        let text = fs::read_to_string(&self.path).with_context(|| {
            format!("cannot read feature file '{}'", self.path.display())
        })?;

        let samples: Vec<FeatureSample> = serde_json::from_str(&text).with_context(|| {
            format!("cannot parse feature file '{}'", self.path.display())
        })?;

        if samples.is_empty() {
            bail!("feature file '{}' contains no samples", self.path.display());
        }

        // Every vector in a split must share one dimension.
        let dim = samples[0].dim();
        if let Some(bad) = samples.iter().position(|s| s.dim() != dim) {
            bail!(
                "feature file '{}': sample {} has dimension {} (expected {})",
                self.path.display(),
                bad,
                samples[bad].dim(),
                dim,
            );
        }

        tracing::debug!(
            "Loaded {} samples of dim {} from '{}'",
            samples.len(),
            dim,
            self.path.display(),
        );
        Ok(samples)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_valid_file() {
        let file = write_temp(
            r#"[
                {"label": 0, "features": [1.0, 2.0]},
                {"label": 3, "features": [0.5, -1.5]}
            ]"#,
        );
        let samples = JsonFeatureLoader::new(file.path()).load_all().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].label, 3);
        assert_eq!(samples[0].features, vec![1.0, 2.0]);
    }

    #[test]
    fn test_rejects_mismatched_dimensions() {
        let file = write_temp(
            r#"[
                {"label": 0, "features": [1.0, 2.0]},
                {"label": 1, "features": [1.0]}
            ]"#,
        );
        let err = JsonFeatureLoader::new(file.path()).load_all().unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[test]
    fn test_rejects_empty_file() {
        let file = write_temp("[]");
        assert!(JsonFeatureLoader::new(file.path()).load_all().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = JsonFeatureLoader::new("/nonexistent/features.json");
        assert!(loader.load_all().is_err());
    }
}
