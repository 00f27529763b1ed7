// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
// Easy to open in a spreadsheet, easy to plot a learning
// curve, and a permanent record of each run.
//
// Metrics recorded per epoch:
//   - epoch:          the epoch number (1, 2, 3, ...)
//   - train_loss:     average next-token cross-entropy on the
//                     training windows
//   - val_loss:       the same on the validation windows
//   - next_token_acc: fraction of validation positions where
//                     the argmax prediction was the true token
//
// How to read them: loss should fall each epoch; val_loss
// rising while train_loss falls means overfitting — the model
// is memorising pieces instead of learning the style.
//
// Output file: {checkpoint_dir}/metrics.csv

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,

    /// Average cross-entropy over all training batches.
    /// Random initialisation gives roughly ln(vocab_size).
    pub train_loss: f64,

    /// Average cross-entropy on the validation set.
    pub val_loss: f64,

    /// Fraction of validation positions predicted exactly,
    /// [PAD] positions excluded. Range [0.0, 1.0].
    pub next_token_acc: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, next_token_acc: f64) -> Self {
        Self { epoch, train_loss, val_loss, next_token_acc }
    }

    /// Did this epoch improve on the previous best val_loss?
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger, writing the CSV header if the
    /// file doesn't exist yet (appending across runs is fine).
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,next_token_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.next_token_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
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
        let m = EpochMetrics::new(2, 2.5, 2.3, 0.2);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_header_written_once() {
        let dir = std::env::temp_dir().join(format!("cadenza-metrics-{}", std::process::id()));
        let logger = MetricsLogger::new(dir.to_string_lossy().into_owned()).unwrap();
        logger.log(&EpochMetrics::new(1, 3.1, 3.0, 0.1)).unwrap();

        // A second logger on the same directory appends, it does
        // not rewrite the header
        let logger2 = MetricsLogger::new(dir.to_string_lossy().into_owned()).unwrap();
        logger2.log(&EpochMetrics::new(2, 2.9, 2.8, 0.15)).unwrap();

        let contents = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(contents.matches("epoch,").count(), 1);
        assert_eq!(contents.lines().count(), 3);

        fs::remove_dir_all(&dir).ok();
    }
}
