use burn::{
    module::Module,
    nn::{conv::Conv2d, Dropout, Linear},
    tensor::{activation::relu, backend::Backend, Int, Tensor},
};

use crate::models::embedding::PaddedEmbedding;

/// Convolutional text classifier: parallel convolutions of several widths over the embedded
/// sequence, max-pooled over time
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Token embedding lookup
    pub embedding: PaddedEmbedding<B>,

    /// One convolution per filter size, each spanning the full embedding width
    pub convs: Vec<Conv2d<B>>,

    /// Dropout before the classification layer
    pub dropout: Dropout,

    /// Linear layer for classification
    pub output: Linear<B>,

    /// The widest filter; shorter sequences are padded to this length
    pub min_seq_length: usize,

    /// Total number of classes
    pub n_classes: usize,
}

impl<B: Backend> Model<B> {
    /// Score a time-major batch of token ids [seq_length, batch_size], returning unnormalized
    /// class scores [batch_size, n_classes]
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        _lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let tokens = self.pad_to_min_length(tokens.swap_dims(0, 1));

        let embedded = self.embedding.forward(tokens);
        let [batch_size, seq_length, embedding_dim] = embedded.dims();
        let embedded = embedded.reshape([batch_size, 1, seq_length, embedding_dim]);

        let pooled = self
            .convs
            .iter()
            .map(|conv| {
                // [batch_size, n_filters, seq_length - filter_size + 1, 1]
                let features = relu(conv.forward(embedded.clone()));
                let [batch_size, n_filters, steps, _] = features.dims();

                features
                    .reshape([batch_size, n_filters, steps])
                    .max_dim(2)
                    .reshape([batch_size, n_filters])
            })
            .collect();

        let features = self.dropout.forward(Tensor::cat(pooled, 1));

        self.output.forward(features)
    }

    fn pad_to_min_length(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        let [batch_size, seq_length] = tokens.dims();

        if seq_length >= self.min_seq_length {
            return tokens;
        }

        let padding = Tensor::<B, 2, Int>::zeros(
            [batch_size, self.min_seq_length - seq_length],
            &tokens.device(),
        )
        .add_scalar(self.embedding.pad_id as i64);

        Tensor::cat(vec![tokens, padding], 1)
    }
}
