// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one row to checkpoints/metrics.csv every time the
// training loop runs validation:
//
//   step,epoch,train_loss,val_loss,lr
//   500,1,5.812300,5.640100,0.000048
//   1000,1,4.977000,4.902800,0.000045
//
// train_loss is the mean over the steps since the previous row.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "step,epoch,train_loss,val_loss,lr";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Global optimisation step at which validation ran
    pub step: usize,

    /// 1-based epoch the step belongs to
    pub epoch: usize,

    pub train_loss: f64,

    pub val_loss: f64,

    /// Learning rate used for the last optimiser step
    pub lr: f64,
}

impl StepMetrics {
    /// True if this validation beat the best loss so far.
    /// NaN (empty validation set) never counts.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header if the file is new; existing runs are appended to.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.8}",
            m.step, m.epoch, m.train_loss, m.val_loss, m.lr,
        )?;

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
