use std::sync::Arc;

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::{
    utils::tensors::{int_tensor, pad_time_major},
    vocab::{Tokenizer, Vocabulary},
};

use super::Item;

/// An inference batch for text classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Token ids as a time-major 2D tensor: [seq_length, batch_size]
    pub tokens: Tensor<B, 2, Int>,

    /// Number of tokens in each sequence before padding: [batch_size]
    pub lengths: Tensor<B, 1, Int>,
}

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// Struct for batching text classification items
#[derive(Clone, Debug)]
pub struct Batcher<B: Backend> {
    /// Tokenizer for splitting text into tokens
    pub tokenizer: Tokenizer,

    /// Vocabulary for converting tokens to ids
    pub vocab: Arc<Vocabulary>,

    /// Sequences are truncated to this many tokens, if set
    pub max_seq_length: Option<usize>,

    /// Batches are padded to at least this many time steps
    pub min_seq_length: usize,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(tokenizer: Tokenizer, vocab: Arc<Vocabulary>, device: B::Device) -> Self {
        Self {
            tokenizer,
            vocab,
            max_seq_length: None,
            min_seq_length: 1,
            device,
        }
    }

    /// Truncate sequences to `max_seq_length` tokens
    pub fn with_max_seq_length(mut self, max_seq_length: Option<usize>) -> Self {
        self.max_seq_length = max_seq_length;
        self
    }

    /// Pad every batch to at least `min_seq_length` time steps
    pub fn with_min_seq_length(mut self, min_seq_length: usize) -> Self {
        self.min_seq_length = min_seq_length.max(1);
        self
    }

    /// Tokenize texts and collect them into an inference batch
    pub fn batch_texts<S: AsRef<str>>(&self, texts: &[S]) -> Infer<B> {
        let token_ids_list = texts
            .iter()
            .map(|text| self.tokenizer.encode(&self.vocab, text.as_ref()).ids)
            .collect();

        self.batch_ids(token_ids_list)
    }

    /// Collect already-encoded token id sequences into an inference batch
    pub fn batch_ids(&self, token_ids_list: Vec<Vec<usize>>) -> Infer<B> {
        let limit = self.max_seq_length.unwrap_or(usize::MAX);

        let lengths: Vec<usize> = token_ids_list
            .iter()
            .map(|ids| ids.len().min(limit))
            .collect();

        let seq_length = lengths
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.min_seq_length);

        let tokens = pad_time_major(
            self.vocab.pad_id(),
            &token_ids_list,
            seq_length,
            &self.device,
        );

        let batch_size = lengths.len();

        Infer {
            tokens,
            lengths: int_tensor(lengths, [batch_size], &self.device),
        }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Collects a vector of texts into an inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        self.batch_texts(&items)
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend, I: Item> dataloader::batcher::Batcher<I, Train<B>> for Batcher<B> {
    /// Collects a vector of text classification items into a training batch
    fn batch(&self, items: Vec<I>) -> Train<B> {
        let texts = items.iter().map(|item| item.text()).collect::<Vec<_>>();
        let input = self.batch_texts(&texts);

        let class_ids = items.iter().map(|item| item.class_id()).collect::<Vec<_>>();
        let batch_size = class_ids.len();

        Train {
            input,
            targets: int_tensor(class_ids, [batch_size], &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, data::dataloader::batcher::Batcher as _};
    use pretty_assertions::assert_eq;

    use crate::datasets::imdb;

    use super::*;

    type TestBackend = NdArray<f32>;

    fn batcher() -> Batcher<TestBackend> {
        let vocab = Vocabulary::from_entries(
            2,
            vec![
                ("good".to_string(), vec![1.0, 0.0]),
                ("film".to_string(), vec![0.0, 1.0]),
            ],
        )
        .unwrap();

        Batcher::new(Tokenizer::default(), Arc::new(vocab), Default::default())
    }

    fn ints<const D: usize>(tensor: Tensor<TestBackend, D, Int>) -> Vec<i64> {
        tensor.into_data().convert::<i64>().value
    }

    #[test]
    fn batches_time_major_with_padding() {
        let batcher = batcher();
        let vocab = batcher.vocab.clone();

        let batch: Infer<TestBackend> =
            batcher.batch(vec!["good film".to_string(), "meh".to_string()]);

        let good = vocab.id("good").unwrap() as i64;
        let film = vocab.id("film").unwrap() as i64;
        let pad = vocab.pad_id() as i64;
        let oov = vocab.oov_id() as i64;

        assert_eq!(batch.tokens.dims(), [2, 2]);
        assert_eq!(ints(batch.tokens), vec![good, oov, film, pad]);
        assert_eq!(ints(batch.lengths), vec![2, 1]);
    }

    #[test]
    fn empty_batch_items_still_have_one_step() {
        let batcher = batcher();

        let batch: Infer<TestBackend> = batcher.batch(vec![String::new()]);

        assert_eq!(batch.tokens.dims(), [1, 1]);
        assert_eq!(ints(batch.lengths), vec![0]);
    }

    #[test]
    fn respects_length_limits() {
        let batcher = batcher()
            .with_max_seq_length(Some(2))
            .with_min_seq_length(4);

        let short: Infer<TestBackend> = batcher.batch(vec!["good".to_string()]);
        assert_eq!(short.tokens.dims(), [4, 1]);

        let batcher = batcher.with_min_seq_length(1);
        let long: Infer<TestBackend> = batcher.batch(vec!["good good good good".to_string()]);
        assert_eq!(long.tokens.dims(), [2, 1]);
        assert_eq!(ints(long.lengths), vec![2]);
    }

    #[test]
    fn batches_training_targets() {
        let batcher = batcher();
        let items = vec![
            imdb::Item::new("good film".to_string(), 1),
            imdb::Item::new("bad film".to_string(), 0),
            imdb::Item::new("film".to_string(), 1),
        ];

        let batch: Train<TestBackend> = batcher.batch(items);

        assert_eq!(batch.input.tokens.dims(), [2, 3]);
        assert_eq!(ints(batch.targets), vec![1, 0, 1]);
    }
}
