// ============================================================
// Layer 3: Model Configuration
// ============================================================
// Immutable description of a classifier, fixed before training:
//
//   embedding_dim   width of each input row
//   num_classes     number of output logits
//   architecture    Linear, or Layered with explicit hidden widths
//   checkpoint_dir  where trained state is persisted and restored
//
// Serialisable so the first training run can store it next to
// the checkpoints and evaluation can rebuild the same model.

use std::{fmt, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Shape of the network between the embedding and the logits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Architecture {
    /// Logits are a single affine map of the embedding.
    Linear,
    /// Fully connected ReLU layers of the given widths, in order,
    /// followed by the output layer.
    Layered { hidden_units: Vec<usize> },
}

impl Architecture {
    /// Widths of the hidden layers; empty for `Linear`.
    pub fn hidden_units(&self) -> &[usize] {
        match self {
            Architecture::Linear => &[],
            Architecture::Layered { hidden_units } => hidden_units,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Linear => f.write_str("linear"),
            Architecture::Layered { hidden_units } => {
                let widths: Vec<String> = hidden_units.iter().map(|w| w.to_string()).collect();
                write!(f, "layered [{}]", widths.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    embedding_dim:  usize,
    num_classes:    usize,
    architecture:   Architecture,
    /// Not stored: a saved config is re-attached to whichever
    /// directory it is read from.
    #[serde(skip)]
    checkpoint_dir: PathBuf,
}

impl ModelConfig {
    /// Validate and build a configuration. Every dimension must be
    /// positive; nothing is accepted on trust.
    pub fn configure(
        architecture:   Architecture,
        embedding_dim:  usize,
        num_classes:    usize,
        checkpoint_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let checkpoint_dir = checkpoint_dir.into();
        if embedding_dim == 0 {
            return Err(ConfigError::ZeroEmbeddingDim);
        }
        if num_classes == 0 {
            return Err(ConfigError::ZeroClasses);
        }
        if let Some(index) = architecture.hidden_units().iter().position(|&w| w == 0) {
            return Err(ConfigError::ZeroHiddenWidth { index });
        }
        if checkpoint_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCheckpointDir);
        }
        Ok(Self { embedding_dim, num_classes, architecture, checkpoint_dir })
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// The same network, persisted in `checkpoint_dir` instead.
    pub fn with_checkpoint_dir(mut self, checkpoint_dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = checkpoint_dir.into();
        self
    }

    /// True when two configurations describe the same network,
    /// regardless of where their checkpoints live.
    pub fn same_network(&self, other: &ModelConfig) -> bool {
        self.embedding_dim == other.embedding_dim
            && self.num_classes == other.num_classes
            && self.architecture == other.architecture
    }
}
