use burn::{
    module::{Module, Param},
    nn::{Embedding, EmbeddingConfig},
    tensor::{backend::Backend, Int, Tensor},
};

/// An embedding lookup that outputs zero vectors at padding positions.
///
/// Masking the output keeps the padding row out of the gradient, so it stays at whatever value it
/// was initialized with.
#[derive(Module, Debug)]
pub struct PaddedEmbedding<B: Backend> {
    /// The embedding table: [vocab_size, embedding_dim]
    pub embedding: Embedding<B>,

    /// Row index of the padding token
    pub pad_id: usize,
}

impl<B: Backend> PaddedEmbedding<B> {
    /// Initialize a randomly-weighted embedding table
    pub fn init(
        vocab_size: usize,
        embedding_dim: usize,
        pad_id: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            embedding: EmbeddingConfig::new(vocab_size, embedding_dim).init(device),
            pad_id,
        }
    }

    /// Use pretrained vectors as the embedding table
    pub fn from_vectors(vectors: Tensor<B, 2>, pad_id: usize, device: &B::Device) -> Self {
        let [vocab_size, embedding_dim] = vectors.dims();

        let mut embedding = EmbeddingConfig::new(vocab_size, embedding_dim).init(device);
        embedding.weight = Param::from_tensor(vectors.to_device(device));

        Self { embedding, pad_id }
    }

    /// Look up token ids of shape [batch_size, seq_length], returning
    /// [batch_size, seq_length, embedding_dim]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_length] = tokens.dims();
        let embedding_dim = self.embedding_dim();

        let keep = tokens
            .clone()
            .equal_elem(self.pad_id as i64)
            .bool_not()
            .float()
            .reshape([batch_size, seq_length, 1])
            .repeat(2, embedding_dim);

        self.embedding.forward(tokens) * keep
    }

    /// Number of rows in the table
    pub fn vocab_size(&self) -> usize {
        self.embedding.weight.dims()[0]
    }

    /// Length of each embedding vector
    pub fn embedding_dim(&self) -> usize {
        self.embedding.weight.dims()[1]
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn padding_positions_are_zero() {
        let device = Default::default();
        let vectors = Tensor::<TestBackend, 2>::from_floats(
            [[9.0, 9.0], [1.0, 2.0], [3.0, 4.0]],
            &device,
        );
        let embedding = PaddedEmbedding::from_vectors(vectors, 0, &device);

        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[1, 0], [2, 1]], &device);
        let output = embedding.forward(tokens);

        assert_eq!(output.dims(), [2, 2, 2]);
        assert_eq!(
            output.into_data().convert::<f32>().value,
            vec![1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 1.0, 2.0]
        );
        assert_eq!(embedding.vocab_size(), 3);
        assert_eq!(embedding.embedding_dim(), 2);
    }
}
