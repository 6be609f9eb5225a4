// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal
// (training or evaluating a classifier).
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Load bundle, configure, train N steps
pub mod train_use_case;

// Restore latest checkpoint, score the test split, build report
pub mod evaluate_use_case;
