/// Common model interface for text classification
pub mod model;

/// Batcher
pub mod batcher;

/// Text Classification Items
pub mod item;

/// Training
pub mod training;

/// Inference
pub mod inference;

pub use batcher::{Batcher, Infer, Train};
pub use inference::infer;
pub use item::Item;
pub use model::Model;
pub use training::{save_artifacts, train, Config};

/// The unique string token that identifies this pipeline
pub static PIPELINE: &str = "text-classification";
