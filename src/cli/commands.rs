// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and their flags:
//
//   train     load bundle, train N steps, checkpoint
//   evaluate  score the latest checkpoint on the test split
//   run       train then evaluate with the full report
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{evaluate_use_case::EvaluateConfig, train_use_case::TrainConfig};
use crate::domain::model_config::Architecture;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a classifier on the cached embeddings
    Train(TrainArgs),

    /// Evaluate the latest checkpoint on the test split
    Evaluate(EvaluateArgs),

    /// Train, then evaluate and print the classification report
    Run(TrainArgs),
}

/// Which canned classifier to build.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    /// Softmax regression on the raw embedding
    Linear,
    /// Fully connected ReLU layers (see --hidden-units)
    Dnn,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// .npz archive with train/test embeddings and targets
    #[arg(long, default_value = "data/newsgroups_embeddings.npz")]
    pub bundle: PathBuf,

    /// Where checkpoints, logs and results are written
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = ModelKind::Linear)]
    pub model: ModelKind,

    /// Hidden layer widths for the dnn model, e.g. 256,128
    #[arg(long, value_delimiter = ',', default_value = "256,128")]
    pub hidden_units: Vec<usize>,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Additional training steps (batches) for this run
    #[arg(long, default_value_t = 10_000)]
    pub steps: u64,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Save a checkpoint every N steps (0 = only at the end)
    #[arg(long, default_value_t = 1000)]
    pub checkpoint_every: u64,

    /// Log the mean training loss every N steps (0 = never)
    #[arg(long, default_value_t = 100)]
    pub log_every: u64,

    /// Checkpoints kept on disk (0 = keep all)
    #[arg(long, default_value_t = 5)]
    pub keep_checkpoints: usize,

    /// Seed for weight initialisation and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl TrainArgs {
    pub fn architecture(&self) -> Architecture {
        match self.model {
            ModelKind::Linear => Architecture::Linear,
            ModelKind::Dnn => Architecture::Layered { hidden_units: self.hidden_units.clone() },
        }
    }
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            architecture:     a.architecture(),
            bundle:           a.bundle,
            checkpoint_dir:   a.checkpoint_dir,
            batch_size:       a.batch_size,
            steps:            a.steps,
            learning_rate:    a.lr,
            checkpoint_every: a.checkpoint_every,
            log_every:        a.log_every,
            keep_max:         a.keep_checkpoints,
            seed:             a.seed,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "data/newsgroups_embeddings.npz")]
    pub bundle: PathBuf,

    /// Directory written by a previous `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Also print per-class precision / recall / F1
    #[arg(long)]
    pub report: bool,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            bundle:         a.bundle,
            checkpoint_dir: a.checkpoint_dir,
            batch_size:     a.batch_size,
            report:         a.report,
        }
    }
}

/// `run` evaluates what it just trained, with the full report.
impl From<&TrainArgs> for EvaluateConfig {
    fn from(a: &TrainArgs) -> Self {
        EvaluateConfig {
            bundle:         a.bundle.clone(),
            checkpoint_dir: a.checkpoint_dir.clone(),
            batch_size:     a.batch_size,
            report:         true,
        }
    }
}
