// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch:
//
//   epoch,lr,train_loss,train_acc,val_acc
//   1,0.050000,3.124500,0.123000,0.418000
//   ...
//
// Output file: <result_dir>/metrics.csv. The file is appended
// across runs so a resumed run continues the same log.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// One row of metrics for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Learning rate used for this epoch
    pub lr: f64,

    /// Average margin cross-entropy loss over training batches
    pub train_loss: f64,

    /// Fraction of training samples classified correctly
    pub train_acc: f64,

    /// Mean episodic accuracy on the validation split
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, lr: f64, train_loss: f64, train_acc: f64, val_acc: f64) -> Self {
        Self { epoch, lr, train_loss, train_acc, val_acc }
    }

    /// True if this epoch beat the previous best validation
    /// accuracy.
    pub fn is_improvement(&self, best_val_acc: f64) -> bool {
        self.val_acc > best_val_acc
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a logger, writing the CSV header if the file is
    /// new.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,lr,train_loss,train_acc,val_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.lr, m.train_loss, m.train_acc, m.val_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_acc={:.4}",
            m.epoch,
            m.train_loss,
            m.val_acc,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.1, 2.5, 0.4, 0.62);
        // 0.62 > 0.60 → improvement
        assert!(m.is_improvement(0.60));
        // 0.62 is NOT greater than 0.65 → no improvement
        assert!(!m.is_improvement(0.65));
    }

    #[test]
    fn test_log_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();

        logger.log(&EpochMetrics::new(1, 0.05, 3.1, 0.12, 0.40)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.06, 2.8, 0.18, 0.45)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,lr,train_loss,train_acc,val_acc");
        assert!(lines[1].starts_with("1,0.050000"));
        assert!(lines[2].starts_with("2,0.060000"));
    }
}
