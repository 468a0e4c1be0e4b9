// ============================================================
// Layer 6 — Configuration
// ============================================================
// Loads the experiment configuration from a YAML document and
// applies literal `key=value` overrides before deserialization.
//
// The resolved config is copied into the result directory at
// train time, so `test` can rebuild the exact same model and
// episode geometry without the original file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::ml::scheduler::DecaySchedule;

/// Configuration errors — the one place the system performs
/// construction-time validation instead of propagating framework
/// errors unchanged.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("missing config field: {0}")]
    MissingField(String),
}

// ─── Experiment configuration ─────────────────────────────────────────────────
/// Top-level configuration, mirroring the YAML document section
/// for section. Every section has defaults so a minimal file
/// only needs the feature paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataSettings,

    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub episode: EpisodeSettings,

    #[serde(default)]
    pub inner: InnerLoopSettings,

    #[serde(default)]
    pub optim: OptimSettings,

    #[serde(default)]
    pub train: TrainSettings,
}

/// Where the pre-extracted feature splits live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Training split (global class labels)
    pub train_features: String,

    /// Validation split; when absent, a slice of the training
    /// split is held out instead
    #[serde(default)]
    pub val_features: Option<String>,

    /// Test split (novel classes)
    pub test_features: String,

    /// Backbone output dimension — every loaded vector must match
    pub feat_dim: usize,
}

/// Meta-training model geometry and margin hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Number of classes in the training split
    pub num_class: usize,

    /// Additive margin on the true-class cosine logit.
    /// Negative values widen the decision boundary, which is the
    /// method's signature choice for transfer to novel classes.
    pub margin: f64,

    /// Logit scale applied after the margin
    pub scale_factor: f64,

    /// Trainable embedding on top of the loaded features;
    /// empty hidden_dims means identity (use features as-is)
    pub embedding: EmbeddingSettings,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            num_class:    64,
            margin:       -0.3,
            scale_factor: 30.0,
            embedding:    EmbeddingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub hidden_dims: Vec<usize>,
    pub dropout:     f64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { hidden_dims: Vec::new(), dropout: 0.0 }
    }
}

/// Episode geometry for validation and test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeSettings {
    pub way:          usize,
    pub shot:         usize,
    pub query_num:    usize,
    /// Episodes evaluated after each training epoch
    pub val_episode:  usize,
    /// Episodes evaluated by the test harness
    pub test_episode: usize,
}

impl Default for EpisodeSettings {
    fn default() -> Self {
        Self { way: 5, shot: 5, query_num: 15, val_episode: 100, test_episode: 600 }
    }
}

/// Per-episode fine-tuning of the fresh classifier head.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerLoopSettings {
    /// Margin used while fitting the episode classifier
    pub margin: f64,

    /// Logit scale for the episode classifier
    pub scale_factor: f64,

    /// Passes over the support set
    pub train_iter: usize,

    /// Support mini-batch size
    pub batch_size: usize,

    /// Optimizer for the inner loop
    pub optim: OptimizerSpec,
}

impl Default for InnerLoopSettings {
    fn default() -> Self {
        Self {
            margin:       -0.3,
            scale_factor: 5.0,
            train_iter:   100,
            batch_size:   4,
            optim:        OptimizerSpec { kind: OptimKind::Sgd, lr: 0.01, momentum: 0.9 },
        }
    }
}

/// Outer (meta-training) optimizer and its warmup schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimSettings {
    pub kind:     OptimKind,
    pub lr:       f64,
    pub momentum: f64,
    pub scheduler: SchedulerSettings,
}

impl Default for OptimSettings {
    fn default() -> Self {
        Self {
            kind:      OptimKind::Sgd,
            lr:        0.1,
            momentum:  0.9,
            scheduler: SchedulerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSpec {
    pub kind:     OptimKind,
    pub lr:       f64,
    #[serde(default)]
    pub momentum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimKind {
    Sgd,
    Adam,
}

/// Warmup wrapper parameters; `after` is the schedule delegated
/// to once the warmup region ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub multiplier:   f64,
    pub warmup_epoch: usize,
    pub after:        DecaySchedule,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            multiplier:   2.0,
            warmup_epoch: 5,
            after:        DecaySchedule::MultiStep { milestones: vec![30, 60], gamma: 0.1 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSettings {
    pub epochs:     usize,
    pub batch_size: usize,
    pub seed:       u64,
    /// Checkpoints, metrics CSV and the resolved config land here
    pub result_dir: String,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            epochs:     100,
            batch_size: 128,
            seed:       42,
            result_dir: "results/negmargin".to_string(),
        }
    }
}

impl Config {
    /// Load a config from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml_with_overrides(path, &[])
    }

    /// Load a config from a YAML file, then patch it with literal
    /// `("dotted.key", "value")` overrides before deserializing.
    /// Values are parsed as YAML scalars, so `optim.lr=0.05` and
    /// `episode.way=5` both do the expected thing.
    pub fn from_yaml_with_overrides(
        path:      impl AsRef<Path>,
        overrides: &[(String, String)],
    ) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str_with_overrides(&text, overrides)
    }

    /// Same as above but from an in-memory document.
    pub fn from_yaml_str_with_overrides(
        text:      &str,
        overrides: &[(String, String)],
    ) -> Result<Self, ConfigError> {
        let mut value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        for (key, raw) in overrides {
            apply_override(&mut value, key, raw)?;
        }

        let cfg: Config =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize back to YAML (for the resolved copy in the
    /// result directory).
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject configurations the rest of the system assumes away.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.feat_dim == 0 {
            return Err(ConfigError::Validation("data.feat_dim must be positive".into()));
        }
        if self.model.num_class < 2 {
            return Err(ConfigError::Validation("model.num_class must be at least 2".into()));
        }
        if self.episode.way < 2 {
            return Err(ConfigError::Validation("episode.way must be at least 2".into()));
        }
        if self.episode.shot == 0 || self.episode.query_num == 0 {
            return Err(ConfigError::Validation(
                "episode.shot and episode.query_num must be positive".into(),
            ));
        }
        if self.inner.train_iter == 0 || self.inner.batch_size == 0 {
            return Err(ConfigError::Validation(
                "inner.train_iter and inner.batch_size must be positive".into(),
            ));
        }
        if self.train.epochs == 0 || self.train.batch_size == 0 {
            return Err(ConfigError::Validation(
                "train.epochs and train.batch_size must be positive".into(),
            ));
        }
        if self.optim.scheduler.multiplier <= 1.0 {
            return Err(ConfigError::Validation(
                "optim.scheduler.multiplier must be greater than 1".into(),
            ));
        }
        if let DecaySchedule::Cosine { t_max, .. } = self.optim.scheduler.after {
            if t_max == 0 {
                return Err(ConfigError::Validation(
                    "optim.scheduler.after.t_max must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Walk the YAML value tree along a dotted path and replace the
/// leaf with the parsed override value. Intermediate keys must
/// already exist — overrides patch the document, they don't
/// invent new sections.
fn apply_override(
    value: &mut serde_yaml::Value,
    key:   &str,
    raw:   &str,
) -> Result<(), ConfigError> {
    let mut node = value;
    let mut parts = key.split('.').peekable();

    while let Some(part) = parts.next() {
        let map = node.as_mapping_mut().ok_or_else(|| {
            ConfigError::Validation(format!("override key '{key}' does not address a mapping"))
        })?;
        let map_key = serde_yaml::Value::String(part.to_string());

        if parts.peek().is_none() {
            let parsed: serde_yaml::Value = serde_yaml::from_str(raw)
                .map_err(|e| ConfigError::Parse(format!("override '{key}': {e}")))?;
            map.insert(map_key, parsed);
            return Ok(());
        }

        node = map
            .get_mut(&map_key)
            .ok_or_else(|| ConfigError::MissingField(key.to_string()))?;
    }

    Ok(())
}

/// Split `KEY=VALUE` strings from the CLI into override pairs.
pub fn parse_override_args(args: &[String]) -> Result<Vec<(String, String)>, ConfigError> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| {
                    ConfigError::Parse(format!("override '{arg}' is not of the form KEY=VALUE"))
                })
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\
data:
  train_features: data/train.json
  test_features: data/test.json
  feat_dim: 640
";

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_yaml_str_with_overrides(MINIMAL, &[]).unwrap();
        assert_eq!(cfg.data.feat_dim, 640);
        assert_eq!(cfg.episode.way, 5);
        assert_eq!(cfg.model.margin, -0.3);
        assert_eq!(cfg.optim.scheduler.warmup_epoch, 5);
        assert!(cfg.data.val_features.is_none());
    }

    #[test]
    fn test_override_patches_nested_key() {
        let overrides = vec![
            ("episode.way".to_string(), "10".to_string()),
            ("model.margin".to_string(), "0.4".to_string()),
        ];
        // Overrides patch existing sections, so the document must
        // carry the section being overridden.
        let text = format!("{MINIMAL}episode:\n  way: 5\nmodel:\n  margin: -0.3\n");
        let cfg = Config::from_yaml_str_with_overrides(&text, &overrides).unwrap();
        assert_eq!(cfg.episode.way, 10);
        assert_eq!(cfg.model.margin, 0.4);
    }

    #[test]
    fn test_override_missing_section_is_an_error() {
        let overrides = vec![("optim.lr".to_string(), "0.05".to_string())];
        let err = Config::from_yaml_str_with_overrides(MINIMAL, &overrides).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_multiplier_of_one_is_rejected() {
        let text = format!("{MINIMAL}optim:\n  scheduler:\n    multiplier: 1.0\n");
        let err = Config::from_yaml_str_with_overrides(&text, &[]).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_parse_override_args() {
        let pairs = parse_override_args(&["optim.lr=0.05".to_string()]).unwrap();
        assert_eq!(pairs, vec![("optim.lr".to_string(), "0.05".to_string())]);
        assert!(parse_override_args(&["no-equals".to_string()]).is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let cfg = Config::from_yaml_str_with_overrides(MINIMAL, &[]).unwrap();
        let text = cfg.to_yaml().unwrap();
        let back = Config::from_yaml_str_with_overrides(&text, &[]).unwrap();
        assert_eq!(back.episode.test_episode, cfg.episode.test_episode);
        assert_eq!(back.train.result_dir, cfg.train.result_dir);
    }
}
