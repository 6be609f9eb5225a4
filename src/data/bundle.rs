// ============================================================
// Layer 4: Array Bundle
// ============================================================
// The in-memory form of the cached embedding archive:
//
//   train_data   [n_train, dim]  f32 embeddings
//   train_target [n_train]       class index per row
//   test_data    [n_test, dim]
//   test_target  [n_test]
//   labels       [n_classes]     human-readable class names
//
// The bundle is immutable once built. Each split sits behind an
// Arc so any number of iterators can read it concurrently with
// the bundle itself, without copying the matrices.

use std::sync::Arc;

use crate::domain::{error::DataError, split::Split};

/// Feature matrix and aligned targets of one split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitData {
    features:      Vec<f32>,
    targets:       Vec<usize>,
    embedding_dim: usize,
}

impl SplitData {
    /// Build a split from a flat row-major matrix with
    /// `targets.len()` rows of `embedding_dim` columns.
    pub fn new(
        features:      Vec<f32>,
        targets:       Vec<usize>,
        embedding_dim: usize,
    ) -> Result<Self, DataError> {
        if embedding_dim == 0 {
            return Err(DataError::ShapeMismatch(
                "embedding dimension must be positive".to_string(),
            ));
        }
        if features.len() != targets.len() * embedding_dim {
            return Err(DataError::ShapeMismatch(format!(
                "{} feature values do not form {} rows of width {}",
                features.len(),
                targets.len(),
                embedding_dim
            )));
        }
        Ok(Self { features, targets, embedding_dim })
    }

    /// Convenience constructor from per-sample rows (copies).
    pub fn from_rows(rows: &[Vec<f32>], targets: Vec<usize>) -> Result<Self, DataError> {
        let embedding_dim = rows.first().map_or(0, Vec::len);
        if let Some(i) = rows.iter().position(|r| r.len() != embedding_dim) {
            return Err(DataError::ShapeMismatch(format!(
                "row {i} has width {}, expected {embedding_dim}",
                rows[i].len()
            )));
        }
        Self::new(rows.concat(), targets, embedding_dim)
    }

    /// Number of samples (rows).
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Feature row `idx`. Panics if `idx >= len()`.
    pub fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.embedding_dim;
        &self.features[start..start + self.embedding_dim]
    }

    pub fn target(&self, idx: usize) -> usize {
        self.targets[idx]
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }
}

#[derive(Debug, Clone)]
pub struct ArrayBundle {
    train:  Arc<SplitData>,
    test:   Arc<SplitData>,
    labels: Vec<String>,
}

impl ArrayBundle {
    /// Assemble a bundle, checking that both splits share one
    /// embedding dimension.
    pub fn new(train: SplitData, test: SplitData, labels: Vec<String>) -> Result<Self, DataError> {
        if train.embedding_dim() != test.embedding_dim() {
            return Err(DataError::ShapeMismatch(format!(
                "train_data has width {} but test_data has width {}",
                train.embedding_dim(),
                test.embedding_dim()
            )));
        }
        if !labels.is_empty() && labels.len() != num_classes_of(&train, &test) {
            tracing::warn!(
                "labels array has {} entries but targets span {} classes; class count follows the targets",
                labels.len(),
                num_classes_of(&train, &test)
            );
        }
        Ok(Self { train: Arc::new(train), test: Arc::new(test), labels })
    }

    pub fn split(&self, split: Split) -> &Arc<SplitData> {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }

    pub fn train(&self) -> &SplitData {
        &self.train
    }

    pub fn test(&self) -> &SplitData {
        &self.test
    }

    pub fn embedding_dim(&self) -> usize {
        self.train.embedding_dim()
    }

    /// Class count derived from the target values themselves
    /// (largest index + 1 over both splits), not from `labels`.
    pub fn num_classes(&self) -> usize {
        num_classes_of(&self.train, &self.test)
    }

    /// Name of every class; falls back to `class_<i>` where the
    /// bundle carries no usable label.
    pub fn label_names(&self) -> Vec<String> {
        (0..self.num_classes().max(self.labels.len()))
            .map(|i| self.labels.get(i).cloned().unwrap_or_else(|| format!("class_{i}")))
            .collect()
    }
}

fn num_classes_of(train: &SplitData, test: &SplitData) -> usize {
    train
        .targets()
        .iter()
        .chain(test.targets())
        .copied()
        .max()
        .map_or(0, |m| m + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(rows: &[[f32; 2]], targets: &[usize]) -> SplitData {
        let rows: Vec<Vec<f32>> = rows.iter().map(|r| r.to_vec()).collect();
        SplitData::from_rows(&rows, targets.to_vec()).unwrap()
    }

    #[test]
    fn test_split_rows_and_targets_align() {
        let s = split(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0]], &[0, 1, 1]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.row(1), &[0.0, 1.0]);
        assert_eq!(s.target(2), 1);
    }

    #[test]
    fn test_split_rejects_misaligned_targets() {
        let err = SplitData::new(vec![0.0; 6], vec![0, 1], 2).unwrap_err();
        assert!(matches!(err, DataError::ShapeMismatch(_)));
    }

    #[test]
    fn test_bundle_rejects_width_mismatch() {
        let train = split(&[[0.0, 0.0]], &[0]);
        let test  = SplitData::new(vec![0.0; 3], vec![0], 3).unwrap();
        assert!(ArrayBundle::new(train, test, vec![]).is_err());
    }

    #[test]
    fn test_class_count_comes_from_targets() {
        let train = split(&[[0.0, 0.0], [1.0, 1.0]], &[0, 3]);
        let test  = split(&[[0.5, 0.5]], &[1]);
        // labels deliberately too short
        let bundle = ArrayBundle::new(train, test, vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(bundle.num_classes(), 4);
        assert_eq!(bundle.label_names(), vec!["a", "b", "class_2", "class_3"]);
    }
}
