// ============================================================
// Layer 6: Training Log
// ============================================================
// Appends the running training loss to a CSV file next to the
// checkpoints, one row every `log_every` steps.
//
// Output file: checkpoints/training_log.csv
//
//   step,loss
//   100,2.871203
//   200,2.114870
//   ...
//
// The file is appended to across runs, so a resumed training
// run continues the same curve. Steps are global steps.
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const LOG_FILE: &str = "training_log.csv";

/// Mean training loss over the steps since the previous row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Global step at which the row was written
    pub step: u64,
    pub loss: f64,
}

/// Running mean of batch losses between two log rows.
#[derive(Debug, Default)]
pub struct LossWindow {
    sum:   f64,
    steps: usize,
}

impl LossWindow {
    pub fn push(&mut self, loss: f64) {
        self.sum   += loss;
        self.steps += 1;
    }

    /// Mean of the window, resetting it. `None` if nothing was pushed.
    pub fn take(&mut self) -> Option<f64> {
        if self.steps == 0 {
            return None;
        }
        let mean = self.sum / self.steps as f64;
        *self = Self::default();
        Some(mean)
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open the log in `dir`, writing the header if the file is new.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join(LOG_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,loss")?;
            tracing::debug!("Created training log: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{},{:.6}", m.step, m.loss)?;
        Ok(())
    }

    /// All rows logged so far, in file order.
    pub fn read_all(&self) -> Result<Vec<StepMetrics>> {
        let text = fs::read_to_string(&self.csv_path)
            .with_context(|| format!("Cannot read '{}'", self.csv_path.display()))?;
        text.lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (step, loss) = line
                    .split_once(',')
                    .with_context(|| format!("malformed log row '{line}'"))?;
                Ok(StepMetrics {
                    step: step.parse().with_context(|| format!("bad step in '{line}'"))?,
                    loss: loss.parse().with_context(|| format!("bad loss in '{line}'"))?,
                })
            })
            .collect()
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_loss_window_mean_and_reset() {
        let mut w = LossWindow::default();
        assert_eq!(w.take(), None);
        w.push(1.0);
        w.push(3.0);
        assert_eq!(w.take(), Some(2.0));
        assert_eq!(w.take(), None);
    }

    #[test]
    fn test_rows_append_across_loggers() {
        let tmp = tempdir().unwrap();
        MetricsLogger::new(tmp.path())
            .unwrap()
            .log(&StepMetrics { step: 100, loss: 2.5 })
            .unwrap();

        // reopening keeps the header and earlier rows
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&StepMetrics { step: 200, loss: 1.25 }).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert!(text.starts_with("step,loss\n"));
        assert_eq!(
            logger.read_all().unwrap(),
            vec![
                StepMetrics { step: 100, loss: 2.5 },
                StepMetrics { step: 200, loss: 1.25 },
            ]
        );
    }
}
