// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores trained state with Burn's DefaultRecorder
// (named MessagePack, full precision so a restore is bit-exact).
//
// Directory layout:
//   checkpoints/
//     model-1000.mpk      ← weights after step 1000
//     optim-1000.mpk      ← Adam moments after step 1000
//     ...
//     checkpoint.json     ← latest step + steps still on disk
//     model_config.json   ← architecture, written on first train
//     eval_results.json   ← last evaluation result
//     training_log.csv    ← see metrics.rs
//
// The model config is stored separately because the weights
// alone cannot rebuild the network: the module has to exist with
// the right shapes before load_record() can fill it.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{DefaultRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::domain::{evaluation::EvaluationResult, model_config::ModelConfig};
use crate::ml::{model::Classifier, trainer::AdamOptimizer};

const STATE_FILE:  &str = "checkpoint.json";
const CONFIG_FILE: &str = "model_config.json";
const EVAL_FILE:   &str = "eval_results.json";

/// Default number of checkpoints kept on disk.
pub const DEFAULT_KEEP_MAX: usize = 5;

/// Contents of checkpoint.json.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CheckpointState {
    latest_step: u64,
    /// Steps with files still on disk, oldest first.
    steps:       Vec<u64>,
}

pub struct CheckpointManager {
    dir:      PathBuf,
    /// 0 keeps everything.
    keep_max: usize,
}

impl CheckpointManager {
    /// Open a checkpoint directory. Nothing is created until the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self { dir: dir.into(), keep_max: DEFAULT_KEEP_MAX })
    }

    pub fn with_keep_max(mut self, keep_max: usize) -> Self {
        self.keep_max = keep_max;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ─── Weights + optimiser state ────────────────────────────────────────────

    /// Write model and optimiser records for `step`, advance
    /// checkpoint.json and prune old checkpoints.
    pub fn save<B: AutodiffBackend>(
        &self,
        model: &Classifier<B>,
        optim: &AdamOptimizer<B>,
        step:  u64,
    ) -> Result<()> {
        self.ensure_dir()?;
        let recorder = DefaultRecorder::new();

        let model_path = self.model_path(step);
        Recorder::<B>::record(&recorder, model.clone().into_record(), model_path.clone())
            .with_context(|| format!("Failed to save model to '{}'", model_path.display()))?;

        let optim_path = self.optim_path(step);
        Recorder::<B>::record(&recorder, optim.to_record(), optim_path.clone())
            .with_context(|| format!("Failed to save optimizer to '{}'", optim_path.display()))?;

        let mut state = self.read_state()?.unwrap_or_default();
        state.latest_step = step;
        if !state.steps.contains(&step) {
            state.steps.push(step);
        }
        self.prune(&mut state)?;
        self.write_json(STATE_FILE, &state)?;

        tracing::debug!("Saved checkpoint for step {}", step);
        Ok(())
    }

    /// Step of the newest checkpoint, or `None` before the first
    /// training run.
    pub fn latest_step(&self) -> Result<Option<u64>> {
        Ok(self.read_state()?.map(|s| s.latest_step))
    }

    /// Steps whose checkpoint files are still on disk, oldest first.
    pub fn retained_steps(&self) -> Result<Vec<u64>> {
        Ok(self.read_state()?.map(|s| s.steps).unwrap_or_default())
    }

    /// Fill `model` with the weights saved at `step`.
    pub fn load_model<B: Backend>(
        &self,
        model:  Classifier<B>,
        step:   u64,
        device: &B::Device,
    ) -> Result<Classifier<B>> {
        let path   = self.model_path(step);
        let record = Recorder::<B>::load(&DefaultRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load model checkpoint '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    /// Restore the Adam moments saved at `step` into `optim`.
    pub fn load_optimizer<B: AutodiffBackend>(
        &self,
        optim:  AdamOptimizer<B>,
        step:   u64,
        device: &B::Device,
    ) -> Result<AdamOptimizer<B>> {
        let path   = self.optim_path(step);
        let record = Recorder::<B>::load(&DefaultRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimizer checkpoint '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }

    // ─── Model configuration ──────────────────────────────────────────────────

    pub fn save_config(&self, cfg: &ModelConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)?;
        tracing::debug!("Saved model config to '{}'", self.dir.join(CONFIG_FILE).display());
        Ok(())
    }

    /// The stored configuration, if a training run has written one,
    /// attached to this directory.
    pub fn load_config(&self) -> Result<Option<ModelConfig>> {
        let stored: Option<ModelConfig> = self.read_json(CONFIG_FILE)?;
        Ok(stored.map(|cfg| cfg.with_checkpoint_dir(self.dir.clone())))
    }

    /// Store `cfg` on first use; afterwards reject any configuration
    /// describing a different network.
    pub fn ensure_config(&self, cfg: &ModelConfig) -> Result<()> {
        match self.load_config()? {
            None => self.save_config(cfg),
            Some(stored) if stored.same_network(cfg) => Ok(()),
            Some(stored) => bail!(
                "checkpoint directory '{}' holds a {} model ({} -> {} classes), \
                 which does not match the requested {} model ({} -> {} classes)",
                self.dir.display(),
                stored.architecture(),
                stored.embedding_dim(),
                stored.num_classes(),
                cfg.architecture(),
                cfg.embedding_dim(),
                cfg.num_classes(),
            ),
        }
    }

    // ─── Evaluation results ───────────────────────────────────────────────────

    pub fn save_evaluation(&self, result: &EvaluationResult) -> Result<()> {
        self.write_json(EVAL_FILE, result)
    }

    pub fn load_evaluation(&self) -> Result<Option<EvaluationResult>> {
        self.read_json(EVAL_FILE)
    }

    // ─── Helpers ──────────────────────────────────────────────────────────────

    // The recorder appends the .mpk extension itself.
    fn model_path(&self, step: u64) -> PathBuf {
        self.dir.join(format!("model-{step}"))
    }

    fn optim_path(&self, step: u64) -> PathBuf {
        self.dir.join(format!("optim-{step}"))
    }

    fn prune(&self, state: &mut CheckpointState) -> Result<()> {
        if self.keep_max == 0 || state.steps.len() <= self.keep_max {
            return Ok(());
        }
        state.steps.sort_unstable();
        let excess = state.steps.len() - self.keep_max;
        for step in state.steps.drain(..excess) {
            for base in [self.model_path(step), self.optim_path(step)] {
                let file = base.with_extension("mpk");
                match fs::remove_file(&file) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(e).with_context(|| {
                            format!("Cannot remove old checkpoint '{}'", file.display())
                        })
                    }
                }
            }
            tracing::debug!("Pruned checkpoint for step {}", step);
        }
        Ok(())
    }

    fn read_state(&self) -> Result<Option<CheckpointState>> {
        self.read_json(STATE_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Cannot create checkpoint directory '{}'", self.dir.display())
        })
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot read '{}'", path.display()))
            }
        };
        let value = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not valid", path.display()))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model_config::Architecture;
    use crate::ml::{trainer::BurnClassifier, TrainBackend};
    use crate::domain::{batch::Batch, traits::Trainable};
    use tempfile::tempdir;

    fn config(dir: &Path, arch: Architecture) -> ModelConfig {
        ModelConfig::configure(arch, 2, 2, dir).unwrap()
    }

    #[test]
    fn test_no_state_before_first_save() {
        let tmp  = tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path()).unwrap();
        assert_eq!(ckpt.latest_step().unwrap(), None);
        assert!(ckpt.load_config().unwrap().is_none());
        assert!(ckpt.load_evaluation().unwrap().is_none());
    }

    #[test]
    fn test_reading_does_not_create_directory() {
        let tmp  = tempdir().unwrap();
        let dir  = tmp.path().join("not-yet");
        let ckpt = CheckpointManager::new(&dir).unwrap();
        assert_eq!(ckpt.latest_step().unwrap(), None);
        assert!(ckpt.load_config().unwrap().is_none());
        assert!(!dir.exists());

        ckpt.save_config(&config(&dir, Architecture::Linear)).unwrap();
        assert!(dir.join("model_config.json").exists());
    }

    #[test]
    fn test_loaded_config_points_at_reading_directory() {
        let tmp   = tempdir().unwrap();
        let old   = tmp.path().join("old");
        let moved = tmp.path().join("moved");
        CheckpointManager::new(&old)
            .unwrap()
            .save_config(&config(&old, Architecture::Linear))
            .unwrap();
        fs::rename(&old, &moved).unwrap();

        let loaded = CheckpointManager::new(&moved).unwrap().load_config().unwrap().unwrap();
        assert_eq!(loaded.checkpoint_dir(), moved.as_path());
        assert!(loaded.same_network(&config(&old, Architecture::Linear)));
    }

    #[test]
    fn test_save_and_restore_weights() {
        let tmp    = tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path()).unwrap();
        let cfg    = config(tmp.path(), Architecture::Layered { hidden_units: vec![3] });
        let device = Default::default();

        let mut clf = BurnClassifier::<TrainBackend>::new(&cfg, 0.01, 1, &device);
        let batch   = Batch::new(vec![0.0, 1.0, 1.0, 0.0], vec![0, 1], 2).unwrap();
        clf.train_step(&batch).unwrap();
        ckpt.save(clf.model(), clf.optimizer(), 1).unwrap();
        assert!(tmp.path().join("model-1.mpk").exists());
        assert!(tmp.path().join("optim-1.mpk").exists());
        assert_eq!(ckpt.latest_step().unwrap(), Some(1));

        let fresh    = BurnClassifier::<TrainBackend>::new(&cfg, 0.01, 99, &device);
        let restored = ckpt
            .load_model(fresh.model().clone(), 1, &device)
            .unwrap();
        let optim = ckpt
            .load_optimizer(fresh.optimizer().clone(), 1, &device)
            .unwrap();
        let restored = BurnClassifier::from_parts(restored, optim, 1, 0.01, &device);

        assert_eq!(
            restored.evaluate_batch(&batch).unwrap(),
            clf.evaluate_batch(&batch).unwrap()
        );
    }

    #[test]
    fn test_prunes_oldest_checkpoints() {
        let tmp    = tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path()).unwrap().with_keep_max(2);
        let cfg    = config(tmp.path(), Architecture::Linear);
        let clf    = BurnClassifier::<TrainBackend>::new(&cfg, 0.01, 1, &Default::default());

        for step in [10, 20, 30] {
            ckpt.save(clf.model(), clf.optimizer(), step).unwrap();
        }
        assert_eq!(ckpt.retained_steps().unwrap(), vec![20, 30]);
        assert_eq!(ckpt.latest_step().unwrap(), Some(30));
        assert!(!tmp.path().join("model-10.mpk").exists());
        assert!(!tmp.path().join("optim-10.mpk").exists());
        assert!(tmp.path().join("model-20.mpk").exists());
    }

    #[test]
    fn test_ensure_config_rejects_different_network() {
        let tmp  = tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path()).unwrap();

        ckpt.ensure_config(&config(tmp.path(), Architecture::Linear)).unwrap();
        // same network is accepted again
        ckpt.ensure_config(&config(tmp.path(), Architecture::Linear)).unwrap();

        let err = ckpt
            .ensure_config(&config(tmp.path(), Architecture::Layered { hidden_units: vec![4] }))
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_evaluation_round_trips_through_json() {
        let tmp    = tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path()).unwrap();
        let result = EvaluationResult {
            accuracy: 0.5, average_loss: 0.7, loss: 2.8, global_step: 12, num_samples: 4,
        };
        ckpt.save_evaluation(&result).unwrap();
        assert_eq!(ckpt.load_evaluation().unwrap(), Some(result));
    }
}
