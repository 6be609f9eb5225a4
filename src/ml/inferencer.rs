// ============================================================
// Layer 5: Inference Loops
// ============================================================
// The read-only halves of the runner, written against the
// Trainable trait so they work with any backend:
//
//   evaluate_batches  one full pass, folds BatchMetrics into an
//                     EvaluationResult
//   Predictions       lazy stream of class indices, one per
//                     sample, in the order the batches arrive
//
// Neither loop shuffles or skips anything; the caller decides
// the order by the iterator it passes in.

use std::{collections::VecDeque, iter::FusedIterator, ops::Deref};

use anyhow::{bail, Result};

use crate::domain::{
    batch::Batch,
    evaluation::{EvaluationAccumulator, EvaluationResult},
    traits::Trainable,
};

/// Score every batch once and return the aggregated metrics.
///
/// Fails when `batches` yields no sample at all: accuracy over an
/// empty split is undefined.
pub fn evaluate_batches<T, I>(model: &T, batches: I) -> Result<EvaluationResult>
where
    T: Trainable + ?Sized,
    I: IntoIterator<Item = Batch>,
{
    let mut acc = EvaluationAccumulator::new();
    for batch in batches {
        acc.add(model.evaluate_batch(&batch)?);
    }
    tracing::debug!("Scored {} samples", acc.samples());

    match acc.finish(model.global_step()) {
        Some(result) => Ok(result),
        None => bail!("cannot evaluate on an empty split"),
    }
}

/// Lazily predicted class indices. A batch is only pulled from the
/// underlying iterator once the previous one has been drained.
///
/// `M` is anything that derefs to the model: a plain reference for
/// borrowed use, or a `Box` when the stream owns a restored model.
pub struct Predictions<M, I> {
    model:   M,
    batches: I,
    pending: VecDeque<usize>,
    failed:  bool,
}

impl<M, I> Predictions<M, I>
where
    M: Deref,
    M::Target: Trainable,
    I: Iterator<Item = Batch>,
{
    pub fn new(model: M, batches: I) -> Self {
        Self { model, batches, pending: VecDeque::new(), failed: false }
    }
}

impl<M, I> Iterator for Predictions<M, I>
where
    M: Deref,
    M::Target: Trainable,
    I: Iterator<Item = Batch>,
{
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Result<usize>> {
        loop {
            if let Some(class) = self.pending.pop_front() {
                return Some(Ok(class));
            }
            if self.failed {
                return None;
            }
            let batch = self.batches.next()?;
            match self.model.predict_batch(&batch) {
                Ok(classes) => self.pending.extend(classes),
                Err(e) => {
                    // stop after reporting the first failure
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<M, I> FusedIterator for Predictions<M, I>
where
    M: Deref,
    M::Target: Trainable,
    I: FusedIterator<Item = Batch>,
{
}
