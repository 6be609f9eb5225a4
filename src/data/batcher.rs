// ============================================================
// Layer 4: Classifier Batcher
// ============================================================
// Converts a domain Batch (flat Vec<f32> + class indices) into
// the tensors the classifier consumes.
//
//   Input:  Batch with N rows of width D
//   Output: ClassifierBatch with
//             features [N, D]  float
//             labels   [N]     int
//
// The feature buffer is already row-major, so building the 2-D
// tensor is a single upload followed by a reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{prelude::*, tensor::backend::AutodiffBackend};

use crate::domain::batch::Batch;

// ─── ClassifierBatch ──────────────────────────────────────────────────────────
/// One batch on the device. B is generic so the same code runs on
/// NdArray in tests and on Wgpu when that feature is enabled.
#[derive(Debug, Clone)]
pub struct ClassifierBatch<B: Backend> {
    /// Embeddings, shape [batch_size, embedding_dim]
    pub features: Tensor<B, 2>,

    /// Gold class per row, shape [batch_size]
    pub labels:   Tensor<B, 1, Int>,
}

impl<B: AutodiffBackend> ClassifierBatch<B> {
    /// Strip the autodiff wrapper for forward-only passes.
    pub fn inner(self) -> ClassifierBatch<B::InnerBackend> {
        ClassifierBatch {
            features: self.features.inner(),
            labels:   self.labels.inner(),
        }
    }
}

// ─── ClassifierBatcher ────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ClassifierBatcher<B: Backend> {
    /// Device the tensors are created on
    pub device: B::Device,
}

impl<B: Backend> ClassifierBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, batch: &Batch) -> ClassifierBatch<B> {
        let rows = batch.len();
        let dim  = batch.embedding_dim();

        let features = Tensor::<B, 1>::from_floats(batch.features(), &self.device)
            .reshape([rows, dim]);

        let labels: Vec<i64> = batch.labels().iter().map(|&c| c as i64).collect();
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ClassifierBatch { features, labels }
    }
}
