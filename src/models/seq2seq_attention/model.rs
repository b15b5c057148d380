use burn::{
    module::Module,
    nn::{lstm::Lstm, Dropout, Linear},
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
};

use crate::{models::embedding::PaddedEmbedding, utils::tensors::reversed_indices};

/// One encoder layer: a forward LSTM and, if bidirectional, a second LSTM run over the
/// time-reversed input
#[derive(Module, Debug)]
pub struct LstmLayer<B: Backend> {
    /// Reads the sequence left to right
    pub forward_lstm: Lstm<B>,

    /// Reads the sequence right to left
    pub backward_lstm: Option<Lstm<B>>,
}

impl<B: Backend> LstmLayer<B> {
    /// Encode a batch-major input of shape [batch_size, seq_length, d_input].
    ///
    /// Returns the per-step hidden states [batch_size, seq_length, hidden * directions] and the
    /// final hidden state of every direction, concatenated: [batch_size, hidden * directions].
    pub fn forward(&self, input: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let (_, hidden_states) = self.forward_lstm.forward(input.clone(), None);
        let last = last_step(hidden_states.clone());

        let Some(backward_lstm) = &self.backward_lstm else {
            return (hidden_states, last);
        };

        let [_, seq_length, _] = input.dims();
        let reversed = reversed_indices::<B>(seq_length, &input.device());

        let (_, reversed_states) =
            backward_lstm.forward(input.select(1, reversed.clone()), None);
        let reversed_last = last_step(reversed_states.clone());

        // Put the backward states back in input order so step t lines up in both directions
        let backward_states = reversed_states.select(1, reversed);

        (
            Tensor::cat(vec![hidden_states, backward_states], 2),
            Tensor::cat(vec![last, reversed_last], 1),
        )
    }
}

fn last_step<B: Backend>(states: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch_size, seq_length, hidden] = states.dims();

    states
        .slice([0..batch_size, seq_length - 1..seq_length, 0..hidden])
        .reshape([batch_size, hidden])
}

/// Bidirectional LSTM classifier with dot-product attention over the time steps
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Token embedding lookup
    pub embedding: PaddedEmbedding<B>,

    /// Stacked LSTM encoder layers
    pub layers: Vec<LstmLayer<B>>,

    /// Dropout before the classification layer
    pub dropout: Dropout,

    /// Linear layer for classification
    pub output: Linear<B>,

    /// Total number of classes
    pub n_classes: usize,
}

impl<B: Backend> Model<B> {
    /// Score a time-major batch of token ids [seq_length, batch_size], returning unnormalized
    /// class scores [batch_size, n_classes]. `lengths` is accepted for interface parity and does
    /// not affect scoring.
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        _lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let (scores, _) = self.forward_with_attention(tokens);

        scores
    }

    /// Like [`Model::forward`], also returning the attention weights [batch_size, seq_length]
    pub fn forward_with_attention(
        &self,
        tokens: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let embedded = self.embedding.forward(tokens.swap_dims(0, 1));
        let last = last_step(embedded.clone());

        let (states, final_hidden) = self
            .layers
            .iter()
            .fold((embedded, last), |(states, _), layer| layer.forward(states));

        let (attended, weights) = attention(states, final_hidden.clone());

        let features = self
            .dropout
            .forward(Tensor::cat(vec![final_hidden, attended], 1));

        (self.output.forward(features), weights)
    }
}

/// Dot-product attention with the final hidden state as the query.
///
/// `states` is [batch_size, seq_length, hidden] and `query` is [batch_size, hidden]. Returns the
/// weighted sum of the states [batch_size, hidden] and the softmax weights over time
/// [batch_size, seq_length].
pub fn attention<B: Backend>(
    states: Tensor<B, 3>,
    query: Tensor<B, 2>,
) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [batch_size, seq_length, hidden] = states.dims();

    let scores = states
        .clone()
        .matmul(query.reshape([batch_size, hidden, 1]))
        .reshape([batch_size, seq_length]);

    let weights = softmax(scores, 1);

    let attended = states
        .swap_dims(1, 2)
        .matmul(weights.clone().reshape([batch_size, seq_length, 1]))
        .reshape([batch_size, hidden]);

    (attended, weights)
}
