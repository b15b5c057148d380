use burn::{
    nn::{conv::Conv2dConfig, DropoutConfig, LinearConfig},
    tensor::{backend::Backend, Tensor},
};

use crate::models::{check_dimension, embedding::PaddedEmbedding, ModelError};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// Number of rows in the embedding table
    pub vocab_size: usize,

    /// Length of each embedding vector
    pub embedding_dim: usize,

    /// Total number of classes
    pub n_classes: usize,

    /// Index of the padding token
    pub pad_id: usize,

    /// Number of filters per filter size
    #[config(default = 100)]
    pub n_filters: usize,

    /// Convolution window widths, in tokens
    #[config(default = "vec![3, 4, 5]")]
    pub filter_sizes: Vec<usize>,

    /// Dropout applied before the classification layer
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl Config {
    /// Check that the hyperparameters describe a buildable model
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [
            ("vocab_size", self.vocab_size),
            ("embedding_dim", self.embedding_dim),
            ("n_classes", self.n_classes),
            ("n_filters", self.n_filters),
        ] {
            if value == 0 {
                return Err(ModelError::Invalid(format!("{name} must be at least 1")));
            }
        }

        if self.filter_sizes.is_empty() || self.filter_sizes.contains(&0) {
            return Err(ModelError::Invalid(format!(
                "filter_sizes must be non-empty and positive, got {:?}",
                self.filter_sizes
            )));
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
        let convs = self
            .filter_sizes
            .iter()
            .map(|&size| {
                Conv2dConfig::new([1, self.n_filters], [size, self.embedding_dim]).init(device)
            })
            .collect();

        let n_features = self.n_filters * self.filter_sizes.len();
        let output = LinearConfig::new(n_features, self.n_classes).init(device);

        Model {
            embedding,
            convs,
            dropout: DropoutConfig::new(self.dropout).init(),
            output,
            min_seq_length: self.filter_sizes.iter().copied().max().unwrap_or(1),
            n_classes: self.n_classes,
        }
    }
}
