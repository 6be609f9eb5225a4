// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything from the cached .npz archive to tensor batches.
//
//   embeddings.npz
//       │
//       ▼
//   NpzLoader          → reads and validates the five arrays
//       │
//       ▼
//   ArrayBundle        → immutable train/test splits behind Arc
//       │
//       ▼
//   DatasetIterator    → shuffled endless train stream, or one
//       │                ordered pass over test
//       ▼
//   ClassifierBatcher  → Batch → [N, D] float + [N] int tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads .npz embedding archives with npyz
pub mod loader;

/// In-memory train/test splits
pub mod bundle;

/// Batching, shuffling and repeating over one split
pub mod iterator;

/// Turns domain batches into Burn tensors
pub mod batcher;
