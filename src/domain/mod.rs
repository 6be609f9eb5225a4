// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that describe what the
// system works with: dataset splits, batches, model
// configuration, evaluation results and the Trainable seam.
//
// Rules for this layer:
//   - NO burn framework types
//   - NO file I/O
//   - Only plain data, validation and pure aggregation
//
// Everything the ML backend needs from the rest of the program
// goes through the `Trainable` trait defined in traits.rs, so a
// different numeric backend can be dropped in without touching
// the iterator or the runner loops.

/// Typed errors for data access and configuration
pub mod error;

/// The two named dataset partitions
pub mod split;

/// A transient (features, labels) mini-batch
pub mod batch;

/// Architecture and feature/class dimensions of a classifier
pub mod model_config;

/// Metrics produced by one evaluation pass
pub mod evaluation;

/// Per-class precision / recall / F1 tally
pub mod report;

/// Core abstractions implemented by the ML layer
pub mod traits;
