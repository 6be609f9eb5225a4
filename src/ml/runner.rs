// ============================================================
// Layer 5: Classifier Runner
// ============================================================
// Drives a BurnClassifier through its lifecycle against one
// checkpoint directory:
//
//   configure ─► train (0..n times) ─► evaluate / predict
//
// Every call starts from whatever is on disk. `train` resumes
// from the latest checkpoint (weights, Adam moments and global
// step) and always ends by writing a checkpoint, so a later
// `evaluate` in another process scores exactly what was trained.
//
// `evaluate` and `predict` never write weights; they fail if no
// training run has produced a checkpoint yet.
//
// Reference: Burn Book §5 (Training, Checkpointing)

use anyhow::{bail, Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::domain::{
    batch::Batch, evaluation::EvaluationResult, model_config::ModelConfig, traits::Trainable,
};
use crate::infra::{
    checkpoint::{CheckpointManager, DEFAULT_KEEP_MAX},
    metrics::{LossWindow, MetricsLogger, StepMetrics},
};
use crate::ml::{
    inferencer::{evaluate_batches, Predictions},
    trainer::BurnClassifier,
    TrainBackend,
};

// ─── Runner options ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    pub learning_rate:    f64,
    /// Save a checkpoint every N global steps (0 = only at the end)
    pub checkpoint_every: u64,
    /// Log the mean loss every N global steps (0 = never)
    pub log_every:        u64,
    /// Checkpoints kept on disk (0 = all)
    pub keep_max:         usize,
    /// Seed for the initial weights of a fresh model
    pub seed:             u64,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            learning_rate:    1e-3,
            checkpoint_every: 1000,
            log_every:        100,
            keep_max:         DEFAULT_KEEP_MAX,
            seed:             42,
        }
    }
}

/// Lazy prediction stream that owns its restored model.
pub type PredictionStream<B, I> = Predictions<Box<BurnClassifier<B>>, I>;

// ─── ClassifierRunner ─────────────────────────────────────────────────────────
pub struct ClassifierRunner<B: AutodiffBackend = TrainBackend> {
    config:      ModelConfig,
    options:     RunnerOptions,
    checkpoints: CheckpointManager,
    device:      B::Device,
}

impl<B: AutodiffBackend> ClassifierRunner<B> {
    pub fn new(config: ModelConfig, options: RunnerOptions, device: B::Device) -> Result<Self> {
        let checkpoints =
            CheckpointManager::new(config.checkpoint_dir())?.with_keep_max(options.keep_max);
        Ok(Self { config, options, checkpoints, device })
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Consume exactly `steps` batches, one optimiser update each,
    /// and return the trained classifier.
    pub fn train<I>(&self, mut batches: I, steps: u64) -> Result<BurnClassifier<B>>
    where
        I: Iterator<Item = Batch>,
    {
        self.checkpoints.ensure_config(&self.config)?;

        let mut clf = match self.restore()? {
            Some(clf) => {
                tracing::info!("Resuming from global step {}", clf.global_step());
                clf
            }
            None => {
                tracing::info!("Initialising a fresh {} model", self.config.architecture());
                self.fresh()
            }
        };

        let logger     = MetricsLogger::new(self.checkpoints.dir())?;
        let mut window = LossWindow::default();
        let mut saved  = None;
        let first_step = clf.global_step();

        for _ in 0..steps {
            let batch = batches.next().with_context(|| {
                format!(
                    "training iterator ran out after {} of {} steps",
                    clf.global_step() - first_step,
                    steps
                )
            })?;
            let loss = clf.train_step(&batch)?;
            window.push(loss);

            let step = clf.global_step();
            if every(step, self.options.log_every) {
                if let Some(loss) = window.take() {
                    tracing::info!("step {:>7} | loss={:.6}", step, loss);
                    logger.log(&StepMetrics { step, loss })?;
                }
            }
            if every(step, self.options.checkpoint_every) {
                self.save(&clf)?;
                saved = Some(step);
            }
        }

        if saved != Some(clf.global_step()) {
            self.save(&clf)?;
        }
        tracing::info!(
            "Training finished at global step {} ({} new steps)",
            clf.global_step(),
            clf.global_step() - first_step
        );
        Ok(clf)
    }

    /// Score the latest checkpoint over one full pass of `batches`.
    pub fn evaluate<I>(&self, batches: I) -> Result<EvaluationResult>
    where
        I: IntoIterator<Item = Batch>,
    {
        let clf    = self.restore_required()?;
        let result = evaluate_batches(&clf, batches)?;
        self.checkpoints.save_evaluation(&result)?;
        tracing::info!(
            "Evaluation at step {}: accuracy={:.4}, average_loss={:.4}",
            result.global_step,
            result.accuracy,
            result.average_loss
        );
        Ok(result)
    }

    /// Predicted class per sample, in the order `batches` yields them.
    pub fn predict<I>(&self, batches: I) -> Result<PredictionStream<B, I>>
    where
        I: Iterator<Item = Batch>,
    {
        let clf = self.restore_required()?;
        Ok(Predictions::new(Box::new(clf), batches))
    }

    // ─── Helpers ──────────────────────────────────────────────────────────────

    fn fresh(&self) -> BurnClassifier<B> {
        BurnClassifier::new(&self.config, self.options.learning_rate, self.options.seed, &self.device)
    }

    fn save(&self, clf: &BurnClassifier<B>) -> Result<()> {
        self.checkpoints.save(clf.model(), clf.optimizer(), clf.global_step())?;
        tracing::info!("Checkpoint saved at step {}", clf.global_step());
        Ok(())
    }

    fn restore(&self) -> Result<Option<BurnClassifier<B>>> {
        let Some(step) = self.checkpoints.latest_step()? else {
            return Ok(None);
        };
        let template = self.fresh();
        let model = self
            .checkpoints
            .load_model(template.model().clone(), step, &self.device)?;
        let optim = self
            .checkpoints
            .load_optimizer(template.optimizer().clone(), step, &self.device)?;
        Ok(Some(BurnClassifier::from_parts(
            model,
            optim,
            step,
            self.options.learning_rate,
            &self.device,
        )))
    }

    fn restore_required(&self) -> Result<BurnClassifier<B>> {
        if let Some(stored) = self.checkpoints.load_config()? {
            if !stored.same_network(&self.config) {
                bail!(
                    "checkpoint directory '{}' was trained with a different model configuration",
                    self.checkpoints.dir().display()
                );
            }
        }
        match self.restore()? {
            Some(clf) => Ok(clf),
            None => bail!(
                "no checkpoint found in '{}'; run training first",
                self.checkpoints.dir().display()
            ),
        }
    }
}

fn every(step: u64, interval: u64) -> bool {
    interval > 0 && step % interval == 0
}
