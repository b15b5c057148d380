//! Bidirectional LSTM with attention for text classification

/// The model configuration
pub mod config;

/// The model
pub mod model;

/// Training and validation steps
pub mod train;

pub use config::{Config, Overrides};
pub use model::{attention, Model, ModelRecord};

/// The architecture name
pub static ARCHITECTURE: &str = "seq2seq-attention";
