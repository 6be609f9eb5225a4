// ============================================================
// Layer 5: Classifier Model
// ============================================================
// A single module type covers both canned architectures:
//
//   linear   embedding ──► Linear ──► logits
//   dnn      embedding ──► [Linear ─► ReLU] x N ──► Linear ──► logits
//
// The loss is softmax cross-entropy over the logits. Burn's
// CrossEntropyLoss returns the batch mean; evaluation scales it
// back up by the row count to get the summed loss.
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig, Relu},
    prelude::*,
};

use crate::domain::model_config::ModelConfig;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub embedding_dim: usize,
    pub num_classes:   usize,
    /// Hidden layer widths in order; empty means a linear model.
    pub hidden_units:  Vec<usize>,
}

impl ClassifierConfig {
    pub fn from_model_config(cfg: &ModelConfig) -> Self {
        Self::new(
            cfg.embedding_dim(),
            cfg.num_classes(),
            cfg.architecture().hidden_units().to_vec(),
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        let mut width  = self.embedding_dim;
        let mut hidden = Vec::with_capacity(self.hidden_units.len());
        for &units in &self.hidden_units {
            hidden.push(LinearConfig::new(width, units).init(device));
            width = units;
        }
        let output = LinearConfig::new(width, self.num_classes).init(device);

        Classifier {
            hidden,
            output,
            activation:    Relu::new(),
            embedding_dim: self.embedding_dim,
            num_classes:   self.num_classes,
        }
    }
}

#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    pub hidden:        Vec<Linear<B>>,
    pub output:        Linear<B>,
    pub activation:    Relu,
    pub embedding_dim: usize,
    pub num_classes:   usize,
}

pub struct ClassifierOutput<B: Backend> {
    /// Mean cross-entropy over the batch, shape [1]
    pub loss:   Tensor<B, 1>,
    /// Raw class scores, shape [batch, num_classes]
    pub logits: Tensor<B, 2>,
}

impl<B: Backend> Classifier<B> {
    /// features: [batch, embedding_dim] → logits: [batch, num_classes]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = features;
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }
        self.output.forward(x)
    }

    pub fn forward_loss(
        &self,
        features: Tensor<B, 2>,
        labels:   Tensor<B, 1, Int>,
    ) -> ClassifierOutput<B> {
        let logits = self.forward(features);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        ClassifierOutput { loss, logits }
    }

    /// Most likely class per row, shape [batch]
    pub fn predict(&self, features: Tensor<B, 2>) -> Tensor<B, 1, Int> {
        // argmax(1) returns [batch, 1]
        self.forward(features).argmax(1).flatten::<1>(0, 1)
    }
}
