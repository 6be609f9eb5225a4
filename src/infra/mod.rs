// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the ml and application
// layers:
//
//   checkpoint.rs  Model weights and Adam state via Burn's
//                  DefaultRecorder, plus the JSON side files
//                  (checkpoint.json, model_config.json,
//                  eval_results.json). Keeps the newest N
//                  checkpoints.
//
//   metrics.rs     Training loss log (training_log.csv),
//                  appended across resumed runs.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training loss CSV logger
pub mod metrics;
