//! # quicktext
//!
//! Text classification with pretrained word vectors: a convolutional classifier and a
//! bidirectional LSTM classifier with attention, built on Burn.
#![forbid(unsafe_code)]

/// Word vectors and tokenization
pub mod vocab;

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Classifier facade
pub mod classifier;

/// Utilities
pub mod utils;

pub use classifier::{ClassifierError, Prediction, TextClassifier};

/// Error macros
#[macro_use]
extern crate anyhow;
