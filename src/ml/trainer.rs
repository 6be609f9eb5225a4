// ============================================================
// Layer 5: Burn Classifier (Trainable backend)
// ============================================================
// Binds the Classifier module and its Adam optimiser to the
// Trainable trait so the runner loops never touch tensors.
//
// Key Burn 0.20 points:
//   - Training runs on an AutodiffBackend so loss.backward()
//     has a graph to walk
//   - Scoring uses model.valid(), which returns the same weights
//     on B::InnerBackend; batches are unwrapped with .inner()
//     to match
//   - argmax(1) returns [batch,1] so it is flattened before
//     .equal()
//
// Every batch is checked against the configured embedding width
// and class count before any tensor is built.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::ClassifierBatcher;
use crate::domain::{
    batch::Batch, evaluation::BatchMetrics, model_config::ModelConfig, traits::Trainable,
};
use crate::ml::model::{Classifier, ClassifierConfig};

pub type AdamOptimizer<B> = OptimizerAdaptor<Adam, Classifier<B>, B>;

pub struct BurnClassifier<B: AutodiffBackend> {
    model:         Classifier<B>,
    optim:         AdamOptimizer<B>,
    learning_rate: f64,
    global_step:   u64,
    batcher:       ClassifierBatcher<B>,
}

impl<B: AutodiffBackend> BurnClassifier<B> {
    /// Fresh, untrained classifier. The backend RNG is seeded first
    /// so the same seed always produces the same initial weights.
    pub fn new(cfg: &ModelConfig, learning_rate: f64, seed: u64, device: &B::Device) -> Self {
        B::seed(device, seed);
        let model = ClassifierConfig::from_model_config(cfg).init::<B>(device);
        Self::from_parts(model, AdamConfig::new().init(), 0, learning_rate, device)
    }

    /// Reassemble a classifier from restored state.
    pub fn from_parts(
        model:         Classifier<B>,
        optim:         AdamOptimizer<B>,
        global_step:   u64,
        learning_rate: f64,
        device:        &B::Device,
    ) -> Self {
        Self {
            model,
            optim,
            learning_rate,
            global_step,
            batcher: ClassifierBatcher::new(device.clone()),
        }
    }

    pub fn model(&self) -> &Classifier<B> {
        &self.model
    }

    pub fn optimizer(&self) -> &AdamOptimizer<B> {
        &self.optim
    }

    fn check_rows(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            bail!("cannot run the classifier on an empty batch");
        }
        if batch.embedding_dim() != self.model.embedding_dim {
            bail!(
                "batch rows have width {}, but the model expects embeddings of width {}",
                batch.embedding_dim(),
                self.model.embedding_dim
            );
        }
        Ok(())
    }

    /// Rows plus labels, for the passes that compute a loss.
    fn check_labelled(&self, batch: &Batch) -> Result<()> {
        self.check_rows(batch)?;
        if let Some(&label) = batch.labels().iter().find(|&&c| c >= self.model.num_classes) {
            bail!(
                "label {label} is out of range for a model with {} classes",
                self.model.num_classes
            );
        }
        Ok(())
    }
}

impl<B: AutodiffBackend> Trainable for BurnClassifier<B> {
    fn global_step(&self) -> u64 {
        self.global_step
    }

    fn train_step(&mut self, batch: &Batch) -> Result<f64> {
        self.check_labelled(batch)?;
        let batch = self.batcher.batch(batch);

        let out = self.model.forward_loss(batch.features, batch.labels);
        let loss: f64 = out.loss.clone().into_scalar().elem::<f64>();

        // Backward pass + Adam update
        let grads = out.loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.learning_rate, self.model.clone(), grads);
        self.global_step += 1;

        Ok(loss)
    }

    fn evaluate_batch(&self, batch: &Batch) -> Result<BatchMetrics> {
        self.check_labelled(batch)?;
        let count = batch.len();
        let batch = self.batcher.batch(batch).inner();
        let model = self.model.valid();

        let out = model.forward_loss(batch.features, batch.labels.clone());
        let mean_loss: f64 = out.loss.into_scalar().elem::<f64>();

        let correct: i64 = out.logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(batch.labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        Ok(BatchMetrics {
            loss_sum: mean_loss * count as f64,
            correct:  correct as usize,
            count,
        })
    }

    fn predict_batch(&self, batch: &Batch) -> Result<Vec<usize>> {
        // labels are ignored here, so any value is acceptable
        self.check_rows(batch)?;
        let features = self.batcher.batch(batch).inner().features;
        let classes  = self.model.valid().predict(features);
        Ok(classes.into_data().iter::<i64>().map(|c| c as usize).collect())
    }
}
