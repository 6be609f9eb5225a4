// ============================================================
// Layer 3: Evaluation Result
// ============================================================
// Evaluation walks the test split exactly once. Each batch
// reports its summed loss and how many rows were classified
// correctly; the accumulator folds those into the final metrics
// so that average_loss is weighted by batch size (a short last
// batch counts for exactly as many samples as it holds).

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Contribution of a single batch to an evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchMetrics {
    /// Per-sample loss summed over the batch.
    pub loss_sum: f64,
    /// Rows whose predicted class equals the true class.
    pub correct:  usize,
    /// Rows in the batch.
    pub count:    usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Fraction of samples predicted correctly.
    pub accuracy:     f64,
    /// Mean per-sample loss.
    pub average_loss: f64,
    /// Cumulative per-sample loss over the split.
    pub loss:         f64,
    /// Training step of the checkpoint that was scored.
    pub global_step:  u64,
    pub num_samples:  usize,
}

impl EvaluationResult {
    /// Metric name to scalar, in a stable order for printing.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("accuracy", self.accuracy),
            ("average_loss", self.average_loss),
            ("loss", self.loss),
            ("global_step", self.global_step as f64),
        ])
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .to_map()
            .into_iter()
            .map(|(name, value)| match name {
                "global_step" => format!("{name}: {}", value as u64),
                _ => format!("{name}: {value:.6}"),
            })
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Running totals over the batches of one evaluation pass.
#[derive(Debug, Default)]
pub struct EvaluationAccumulator {
    loss_sum: f64,
    correct:  usize,
    count:    usize,
}

impl EvaluationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, batch: BatchMetrics) {
        self.loss_sum += batch.loss_sum;
        self.correct  += batch.correct;
        self.count    += batch.count;
    }

    pub fn samples(&self) -> usize {
        self.count
    }

    /// Final metrics, or `None` when no sample was seen.
    pub fn finish(self, global_step: u64) -> Option<EvaluationResult> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(EvaluationResult {
            accuracy:     self.correct as f64 / n,
            average_loss: self.loss_sum / n,
            loss:         self.loss_sum,
            global_step,
            num_samples:  self.count,
        })
    }
}
