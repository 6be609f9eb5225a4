// ============================================================
// Layer 3: Split
// ============================================================
// A split names one of the two fixed dataset partitions. Parsing
// a split from text is the one place where an unknown name can
// enter the system, so it fails fast with DataError::InvalidSplit
// before any iterator exists.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    /// Bundle key of the feature matrix, e.g. `train_data`.
    pub fn data_key(self) -> String {
        format!("{}_data", self.as_str())
    }

    /// Bundle key of the class-index vector, e.g. `test_target`.
    pub fn target_key(self) -> String {
        format!("{}_target", self.as_str())
    }
}

impl FromStr for Split {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(DataError::InvalidSplit(other.to_string())),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
