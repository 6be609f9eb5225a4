// ============================================================
// Layer 3: Batch
// ============================================================
// One mini-batch: a row-major feature matrix of shape
// [len, embedding_dim] and one class index per row. A batch is
// produced per training or evaluation step and owned by that
// step only.

use crate::domain::error::DataError;

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    features:      Vec<f32>,
    labels:        Vec<usize>,
    embedding_dim: usize,
}

impl Batch {
    /// Build a batch, checking that `features` holds exactly
    /// `labels.len()` rows of `embedding_dim` values.
    pub fn new(
        features:      Vec<f32>,
        labels:        Vec<usize>,
        embedding_dim: usize,
    ) -> Result<Self, DataError> {
        if embedding_dim == 0 {
            return Err(DataError::ShapeMismatch(
                "batch embedding dimension must be positive".to_string(),
            ));
        }
        if features.len() != labels.len() * embedding_dim {
            return Err(DataError::ShapeMismatch(format!(
                "batch has {} feature values, expected {} rows x {} columns",
                features.len(),
                labels.len(),
                embedding_dim
            )));
        }
        Ok(Self { features, labels, embedding_dim })
    }

    /// Assemble a batch from rows already known to be well formed,
    /// e.g. rows copied out of a validated split.
    pub(crate) fn from_validated(
        features:      Vec<f32>,
        labels:        Vec<usize>,
        embedding_dim: usize,
    ) -> Self {
        debug_assert_eq!(features.len(), labels.len() * embedding_dim);
        Self { features, labels, embedding_dim }
    }

    /// Number of samples (rows) in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Flat row-major feature values.
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Feature row `idx`. Panics if `idx >= len()`.
    pub fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.embedding_dim;
        &self.features[start..start + self.embedding_dim]
    }
}
