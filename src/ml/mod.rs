// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives in this layer and in the tensor
// batcher; the domain and application layers never see a tensor.
//
//   model.rs      Linear / ReLU classifier and its Config
//
//   trainer.rs    BurnClassifier: model + Adam behind the
//                 Trainable trait (train / score / predict
//                 one batch)
//
//   inferencer.rs Backend-agnostic evaluation pass and lazy
//                 prediction stream over any Trainable
//
//   runner.rs     ClassifierRunner: train N steps with periodic
//                 checkpoints, evaluate and predict from the
//                 latest checkpoint
//
// Backend selection:
//   default        Autodiff<NdArray>  (CPU, used by the tests)
//   --features wgpu Autodiff<Wgpu>
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Linear and feed-forward classifier architecture
pub mod model;

/// Trainable implementation backed by Burn + Adam
pub mod trainer;

/// Evaluation pass and prediction stream
pub mod inferencer;

/// Train / evaluate / predict against a checkpoint directory
pub mod runner;

#[cfg(not(feature = "wgpu"))]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[cfg(feature = "wgpu")]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
