// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The runner loops (train N steps, evaluate one epoch, stream
// predictions) only ever talk to a model through `Trainable`.
//
// Implementations:
//   - BurnClassifier (ml/trainer.rs) -> burn Linear/ReLU stack
//   - test doubles in the runner tests

use anyhow::Result;

use crate::domain::{batch::Batch, evaluation::BatchMetrics};

/// A model whose parameters are updated one batch at a time.
pub trait Trainable {
    /// Number of parameter updates applied so far, including those
    /// restored from a checkpoint.
    fn global_step(&self) -> u64;

    /// Apply one optimiser update from `batch` and return the mean
    /// loss of the batch before the update.
    fn train_step(&mut self, batch: &Batch) -> Result<f64>;

    /// Score `batch` without changing any parameter.
    fn evaluate_batch(&self, batch: &Batch) -> Result<BatchMetrics>;

    /// Predicted class index for each row of `batch`, in row order.
    fn predict_batch(&self, batch: &Batch) -> Result<Vec<usize>>;
}
