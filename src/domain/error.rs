// ============================================================
// Layer 3: Domain Errors
// ============================================================
// The application layer works in anyhow::Result, but the two
// kinds of failure callers may want to match on get their own
// types. thiserror derives Display and std::error::Error, so
// both convert into anyhow::Error with a plain `?`.

use thiserror::Error;

/// Failures while loading, validating or iterating an array bundle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Split name other than "train" or "test".
    #[error("invalid split '{0}': expected \"train\" or \"test\"")]
    InvalidSplit(String),

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    /// Array shapes that violate the bundle invariants.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("array '{0}' is missing from the bundle")]
    MissingArray(String),

    #[error("array '{name}' has unsupported dtype {dtype}")]
    UnsupportedDtype { name: String, dtype: String },

    /// A class index that cannot be used as a label.
    #[error("array '{name}' holds invalid class index {value} at row {row}")]
    InvalidTarget { name: String, row: usize, value: i64 },
}

/// Rejected model configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("embedding dimension must be positive")]
    ZeroEmbeddingDim,

    #[error("class count must be positive")]
    ZeroClasses,

    #[error("hidden layer {index} has width 0; widths must be positive")]
    ZeroHiddenWidth { index: usize },

    #[error("checkpoint directory must not be empty")]
    EmptyCheckpointDir,
}
