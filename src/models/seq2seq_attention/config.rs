use std::path::Path;

use burn::{
    nn::{lstm::LstmConfig, DropoutConfig, LinearConfig},
    tensor::{backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::models::{check_dimension, embedding::PaddedEmbedding, ModelError};

use super::{model::LstmLayer, Model};

/// The Model Configuration
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// Number of rows in the embedding table
    pub vocab_size: usize,

    /// Total number of classes
    pub n_classes: usize,

    /// Length of each embedding vector
    #[config(default = 300)]
    pub embedding_dim: usize,

    /// Size of the LSTM hidden state, per direction
    #[config(default = 32)]
    pub hidden_dim: usize,

    /// Number of stacked LSTM layers
    #[config(default = 1)]
    pub n_layers: usize,

    /// Run a second LSTM over the reversed sequence in every layer
    #[config(default = true)]
    pub bidirectional: bool,

    /// Dropout applied before the classification layer
    #[config(default = 0.2)]
    pub dropout: f64,

    /// Index of the padding token
    #[config(default = 0)]
    pub pad_id: usize,
}

/// Hyperparameters that replace the defaults key by key. Unset keys keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    /// Length of each embedding vector
    pub embedding_dim: Option<usize>,

    /// Size of the LSTM hidden state, per direction
    pub hidden_dim: Option<usize>,

    /// Number of stacked LSTM layers
    pub n_layers: Option<usize>,

    /// Run a second LSTM over the reversed sequence in every layer
    pub bidirectional: Option<bool>,

    /// Dropout applied before the classification layer
    pub dropout: Option<f64>,
}

impl Overrides {
    /// Parse overrides from a YAML document
    pub fn from_yaml(document: &str) -> Result<Self, ModelError> {
        Ok(serde_yaml::from_str(document)?)
    }

    /// Read overrides from a YAML file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let document = tokio::fs::read_to_string(path).await?;

        Self::from_yaml(&document)
    }
}

impl Config {
    /// Return a copy of this config with every key set in `overrides` replaced
    pub fn merge(&self, overrides: &Overrides) -> Self {
        Self {
            embedding_dim: overrides.embedding_dim.unwrap_or(self.embedding_dim),
            hidden_dim: overrides.hidden_dim.unwrap_or(self.hidden_dim),
            n_layers: overrides.n_layers.unwrap_or(self.n_layers),
            bidirectional: overrides.bidirectional.unwrap_or(self.bidirectional),
            dropout: overrides.dropout.unwrap_or(self.dropout),
            ..self.clone()
        }
    }

    /// Number of LSTM directions
    pub fn n_directions(&self) -> usize {
        if self.bidirectional {
            2
        } else {
            1
        }
    }

    /// Check that the hyperparameters describe a buildable model
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [
            ("vocab_size", self.vocab_size),
            ("n_classes", self.n_classes),
            ("embedding_dim", self.embedding_dim),
            ("hidden_dim", self.hidden_dim),
            ("n_layers", self.n_layers),
        ] {
            if value == 0 {
                return Err(ModelError::Invalid(format!("{name} must be at least 1")));
            }
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::Invalid(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }

        if self.pad_id >= self.vocab_size {
            return Err(ModelError::Invalid(format!(
                "pad_id {} is outside a vocabulary of {} rows",
                self.pad_id, self.vocab_size
            )));
        }

        Ok(())
    }

    /// Validate, then initialize the model with a random embedding table
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Model<B>, ModelError> {
        self.validate()?;

        let embedding =
            PaddedEmbedding::init(self.vocab_size, self.embedding_dim, self.pad_id, device);

        Ok(self.init_with_embedding(embedding, device))
    }

    /// Validate, then initialize the model with pretrained vectors of shape
    /// [vocab_size, embedding_dim]
    pub fn init_with_vectors<B: Backend>(
        &self,
        vectors: Tensor<B, 2>,
        device: &B::Device,
    ) -> Result<Model<B>, ModelError> {
        self.validate()?;

        let [vocab_size, embedding_dim] = vectors.dims();
        check_dimension("vocab_size", self.vocab_size, vocab_size)?;
        check_dimension("embedding_dim", self.embedding_dim, embedding_dim)?;

        let embedding = PaddedEmbedding::from_vectors(vectors, self.pad_id, device);

        Ok(self.init_with_embedding(embedding, device))
    }

    fn init_with_embedding<B: Backend>(
        &self,
        embedding: PaddedEmbedding<B>,
        device: &B::Device,
    ) -> Model<B> {
        let encoded_dim = self.hidden_dim * self.n_directions();

        let layers = (0..self.n_layers)
            .map(|layer| {
                let d_input = if layer == 0 {
                    self.embedding_dim
                } else {
                    encoded_dim
                };
                let lstm = LstmConfig::new(d_input, self.hidden_dim, true);

                LstmLayer {
                    forward_lstm: lstm.init(device),
                    backward_lstm: self.bidirectional.then(|| lstm.init(device)),
                }
            })
            .collect();

        // The classifier sees the final hidden state concatenated with the attention output
        let output = LinearConfig::new(encoded_dim * 2, self.n_classes).init(device);

        Model {
            embedding,
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            output,
            n_classes: self.n_classes,
        }
    }
}
