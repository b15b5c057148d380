//! A classifier that binds a vocabulary, a model and class labels

use std::sync::Arc;

use burn::tensor::{activation::softmax, backend::Backend};

use crate::{
    models::{AnyModel, Architecture, ModelError},
    pipelines::text_classification::{Batcher, Model as _},
    utils::classes::argmax,
    vocab::{Tokenizer, Vocabulary},
};

/// The outcome of classifying one text
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Index of the predicted class
    pub class_id: usize,

    /// Name of the predicted class
    pub label: String,

    /// Softmax probability of every class, in class id order
    pub probabilities: Vec<f32>,

    /// Number of tokens found in the vocabulary
    pub known_tokens: usize,

    /// Number of tokens in the text
    pub total_tokens: usize,
}

impl Prediction {
    /// Probability of the predicted class, if `class_id` indexes `probabilities`
    pub fn confidence(&self) -> Option<f32> {
        self.probabilities.get(self.class_id).copied()
    }
}

/// Groups a vocabulary, a model and the class labels it predicts
#[derive(Debug)]
pub struct TextClassifier<B: Backend> {
    vocab: Arc<Vocabulary>,
    tokenizer: Tokenizer,
    model: AnyModel<B>,
    classes: Vec<String>,
    batcher: Batcher<B>,
}

impl<B: Backend> TextClassifier<B> {
    /// Build a classifier. The reserved padding and out-of-vocabulary tokens are added to the
    /// vocabulary, then the architecture is resolved against it.
    pub fn new(
        mut vocab: Vocabulary,
        arch: Architecture<B>,
        classes: Vec<String>,
        device: B::Device,
    ) -> Result<Self, ClassifierError> {
        if classes.is_empty() {
            return Err(ClassifierError::NoClasses);
        }

        vocab.ensure_reserved();

        let model = arch.resolve(&vocab, classes.len(), &device)?;

        let vocab = Arc::new(vocab);
        let tokenizer = Tokenizer::default();
        let batcher = Batcher::new(tokenizer.clone(), vocab.clone(), device)
            .with_min_seq_length(model.min_seq_length());

        log::debug!(
            "Created {} classifier over {} classes",
            model.name(),
            classes.len()
        );

        Ok(Self {
            vocab,
            tokenizer,
            model,
            classes,
            batcher,
        })
    }

    /// Use a different tokenizer
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.batcher.tokenizer = tokenizer.clone();
        self.tokenizer = tokenizer;
        self
    }

    /// The bound vocabulary
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The bound model
    pub fn model(&self) -> &AnyModel<B> {
        &self.model
    }

    /// Class labels, in class id order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Classify a single text.
    ///
    /// Text with no tokens at all is rejected. Text made only of unknown tokens is still
    /// classified, and reports `known_tokens == 0`.
    pub fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let mut predictions = self.predict_batch(&[text])?;

        predictions.pop().ok_or(ClassifierError::EmptyText(0))
    }

    /// Classify several texts in one batch
    pub fn predict_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
    ) -> Result<Vec<Prediction>, ClassifierError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut encodings = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let encoding = self.tokenizer.encode(&self.vocab, text.as_ref());

            if encoding.ids.is_empty() {
                return Err(ClassifierError::EmptyText(index));
            }

            encodings.push(encoding);
        }

        let input = self
            .batcher
            .batch_ids(encodings.iter().map(|e| e.ids.clone()).collect());

        let scores = self.model.infer(input);
        let probabilities = softmax(scores, 1).into_data().convert::<f32>().value;

        let n_classes = self.classes.len();

        let predictions = probabilities
            .chunks(n_classes)
            .zip(encodings)
            .map(|(probabilities, encoding)| {
                let class_id = argmax(probabilities).unwrap_or(0);

                Prediction {
                    class_id,
                    label: self.classes[class_id].clone(),
                    probabilities: probabilities.to_vec(),
                    known_tokens: encoding.known,
                    total_tokens: encoding.ids.len(),
                }
            })
            .collect();

        Ok(predictions)
    }
}

/// Classifier Error
#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    /// No class labels were given
    #[error("a classifier needs at least one class")]
    NoClasses,

    /// A text produced no tokens
    #[error("text at position {0} contains no tokens")]
    EmptyText(usize),

    /// The model could not be built or did not fit the vocabulary
    #[error(transparent)]
    Model(#[from] ModelError),
}
