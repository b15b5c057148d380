//! Convolutional network for text classification

/// The model configuration
pub mod config;

/// The model
pub mod model;

/// Training and validation steps
pub mod train;

pub use config::Config;
pub use model::{Model, ModelRecord};

/// The architecture name
pub static ARCHITECTURE: &str = "cnn2d";
