// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Load the embedding bundle       (Layer 4 - data)
//   Step 2: Configure the model             (Layer 3 - domain)
//   Step 3: Build the shuffled train stream (Layer 4 - data)
//   Step 4: Train N steps, checkpointing    (Layer 5 - ml)
//
// The class count comes from the targets, not from the labels
// array, and the embedding width from the data itself.
//
// The train stream is seeded, and a resumed run first skips the
// batches earlier runs consumed (one per global step), so 2 + 3
// steps see the same batches as 5 steps in one go.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::{
    iterator::{DatasetIterator, IteratorOptions, DEFAULT_BATCH_SIZE},
    loader::NpzLoader,
};
use crate::domain::{
    model_config::{Architecture, ModelConfig},
    split::Split,
    traits::Trainable,
};
use crate::ml::runner::{ClassifierRunner, RunnerOptions};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub bundle:           PathBuf,
    pub checkpoint_dir:   PathBuf,
    pub architecture:     Architecture,
    pub batch_size:       usize,
    pub steps:            u64,
    pub learning_rate:    f64,
    pub checkpoint_every: u64,
    pub log_every:        u64,
    pub keep_max:         usize,
    pub seed:             u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let runner = RunnerOptions::default();
        Self {
            bundle:           PathBuf::from("data/newsgroups_embeddings.npz"),
            checkpoint_dir:   PathBuf::from("checkpoints"),
            architecture:     Architecture::Linear,
            batch_size:       DEFAULT_BATCH_SIZE,
            steps:            10_000,
            learning_rate:    runner.learning_rate,
            checkpoint_every: runner.checkpoint_every,
            log_every:        runner.log_every,
            keep_max:         runner.keep_max,
            seed:             runner.seed,
        }
    }
}

impl TrainConfig {
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            learning_rate:    self.learning_rate,
            checkpoint_every: self.checkpoint_every,
            log_every:        self.log_every,
            keep_max:         self.keep_max,
            seed:             self.seed,
        }
    }
}

/// What a finished training run reports back to the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub model:       ModelConfig,
    pub global_step: u64,
    pub new_steps:   u64,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Load the bundle ───────────────────────────────────────────
        let bundle = NpzLoader::new(&cfg.bundle).load()?;

        // ── Step 2: Configure ─────────────────────────────────────────────────
        let model = ModelConfig::configure(
            cfg.architecture.clone(),
            bundle.embedding_dim(),
            bundle.num_classes(),
            &cfg.checkpoint_dir,
        )?;
        tracing::info!(
            "Training {} model: {} -> {} classes, batch_size={}, steps={}",
            model.architecture(),
            model.embedding_dim(),
            model.num_classes(),
            cfg.batch_size,
            cfg.steps
        );

        let runner: ClassifierRunner =
            ClassifierRunner::new(model.clone(), cfg.runner_options(), Default::default())?;

        // ── Step 3: Train stream (shuffled, endless) ──────────────────────────
        let options = IteratorOptions::for_split(Split::Train).with_seed(cfg.seed);
        let mut batches = DatasetIterator::new(
            Arc::clone(bundle.split(Split::Train)),
            cfg.batch_size,
            options,
        )?;
        if let Some(resumed) = runner.checkpoints().latest_step()? {
            let skipped = batches.skip_batches(resumed);
            tracing::debug!("Skipped {} batches already seen before step {}", skipped, resumed);
        }

        // ── Step 4: Train ─────────────────────────────────────────────────────
        let clf = runner.train(batches, cfg.steps)?;

        Ok(TrainSummary {
            model,
            global_step: clf.global_step(),
            new_steps:   cfg.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::evaluate_use_case::{EvaluateConfig, EvaluateUseCase};
    use crate::data::loader::test_support::write_bundle;
    use std::{fs, path::Path};
    use tempfile::tempdir;

    fn copy_dir(from: &Path, to: &Path) {
        fs::create_dir_all(to).unwrap();
        for entry in fs::read_dir(from).unwrap() {
            let entry = entry.unwrap();
            fs::copy(entry.path(), to.join(entry.file_name())).unwrap();
        }
    }

    #[test]
    fn test_trains_and_resumes_from_bundle_on_disk() {
        let tmp = tempdir().unwrap();
        let bundle = tmp.path().join("bundle.npz");
        write_bundle(&bundle, 2, &[0., 0., 0., 1., 1., 0., 1., 1.], &[0, 1, 2, 0], &[0., 1.], &[1]);

        let config = TrainConfig {
            bundle,
            checkpoint_dir: tmp.path().join("ckpt"),
            batch_size: 2,
            steps: 3,
            ..TrainConfig::default()
        };
        let first = TrainUseCase::new(config.clone()).execute().unwrap();
        assert_eq!(first.global_step, 3);
        // class count comes from the targets (0..=2)
        assert_eq!(first.model.num_classes(), 3);
        assert_eq!(first.model.embedding_dim(), 2);

        let second = TrainUseCase::new(config).execute().unwrap();
        assert_eq!(second.global_step, 6);
    }

    #[test]
    fn test_split_run_matches_continuous_run() {
        let tmp = tempdir().unwrap();
        let bundle = tmp.path().join("bundle.npz");
        write_bundle(
            &bundle, 2,
            &[-2., 1., -1., -1., 2., -1., 1., 1.], &[0, 0, 1, 1],
            &[-1., 0., 1., 0.], &[0, 1],
        );
        let config = |dir: &str, steps| TrainConfig {
            bundle: bundle.clone(),
            checkpoint_dir: tmp.path().join(dir),
            batch_size: 1,
            steps,
            learning_rate: 0.1,
            ..TrainConfig::default()
        };

        // both runs start from the same saved initial weights
        TrainUseCase::new(config("split", 0)).execute().unwrap();
        copy_dir(&tmp.path().join("split"), &tmp.path().join("whole"));

        TrainUseCase::new(config("split", 1)).execute().unwrap();
        let split = TrainUseCase::new(config("split", 1)).execute().unwrap();
        let whole = TrainUseCase::new(config("whole", 2)).execute().unwrap();
        assert_eq!(split.global_step, 2);
        assert_eq!(whole.global_step, 2);

        let evaluate = |dir: &str| {
            EvaluateUseCase::new(EvaluateConfig {
                bundle: bundle.clone(),
                checkpoint_dir: tmp.path().join(dir),
                batch_size: 2,
                report: false,
            })
            .execute()
            .unwrap()
            .result
        };
        assert_eq!(evaluate("split"), evaluate("whole"));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let tmp = tempdir().unwrap();
        let bundle = tmp.path().join("bundle.npz");
        write_bundle(&bundle, 1, &[0., 1.], &[0, 1], &[1.], &[1]);

        let config = TrainConfig {
            bundle,
            checkpoint_dir: tmp.path().join("ckpt"),
            batch_size: 0,
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(config).execute().unwrap_err();
        assert!(err.to_string().contains("batch size"));
    }
}
