// ============================================================
// Layer 2: EvaluateUseCase
// ============================================================
// Scores the latest checkpoint on the test split:
//
//   Step 1: Read model_config.json         (Layer 6 - infra)
//   Step 2: Load the embedding bundle      (Layer 4 - data)
//   Step 3: One pass for accuracy / loss   (Layer 5 - ml)
//   Step 4: Optional second pass for the
//           per-sample predictions and the
//           classification report          (Layer 3 - domain)
//
// The test stream is never shuffled, so predictions pair up
// with test_target row for row.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::{iterator::{make_iterator, DEFAULT_BATCH_SIZE}, loader::NpzLoader};
use crate::domain::{evaluation::EvaluationResult, report::ClassificationReport};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::runner::{ClassifierRunner, RunnerOptions};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateConfig {
    pub bundle:         PathBuf,
    pub checkpoint_dir: PathBuf,
    pub batch_size:     usize,
    /// Also predict every test sample and build a report.
    pub report:         bool,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            bundle:         PathBuf::from("data/newsgroups_embeddings.npz"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            batch_size:     DEFAULT_BATCH_SIZE,
            report:         false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub result:      EvaluationResult,
    /// Predicted class per test sample, when a report was requested.
    pub predictions: Option<Vec<usize>>,
    pub report:      Option<ClassificationReport>,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvaluationOutcome> {
        let cfg = &self.config;

        // ── Step 1: Rebuild the model description ─────────────────────────────
        let model = CheckpointManager::new(&cfg.checkpoint_dir)?
            .load_config()?
            .with_context(|| {
                format!(
                    "No model_config.json in '{}'. Run 'train' before 'evaluate'.",
                    cfg.checkpoint_dir.display()
                )
            })?;

        // ── Step 2: Load the bundle ───────────────────────────────────────────
        let bundle = NpzLoader::new(&cfg.bundle).load()?;

        // ── Step 3: Accuracy and loss ─────────────────────────────────────────
        let runner: ClassifierRunner =
            ClassifierRunner::new(model, RunnerOptions::default(), Default::default())?;
        let result = runner.evaluate(make_iterator(&bundle, "test", cfg.batch_size)?)?;

        if !cfg.report {
            return Ok(EvaluationOutcome { result, predictions: None, report: None });
        }

        // ── Step 4: Predictions + report ──────────────────────────────────────
        let predictions: Vec<usize> = runner
            .predict(make_iterator(&bundle, "test", cfg.batch_size)?)?
            .collect::<Result<_>>()?;
        let report = ClassificationReport::from_pairs(
            bundle.test().targets(),
            &predictions,
            &bundle.label_names(),
        )?;

        Ok(EvaluationOutcome {
            result,
            predictions: Some(predictions),
            report:      Some(report),
        })
    }
}
