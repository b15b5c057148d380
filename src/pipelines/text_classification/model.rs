use burn::{
    nn::loss::CrossEntropyLossConfig,
    tensor::{backend::Backend, Tensor},
    train::ClassificationOutput,
};

use super::batcher::{Infer, Train};

/// A trait for models that can be used for Text Classification
pub trait Model<B: Backend> {
    /// Produce unnormalized class scores of shape [batch_size, n_classes]
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2>;

    /// Total number of classes
    fn n_classes(&self) -> usize;

    /// Number of rows in the embedding table
    fn vocab_size(&self) -> usize;

    /// The shortest sequence the model accepts without padding
    fn min_seq_length(&self) -> usize {
        1
    }

    /// Perform a forward pass and compute the cross-entropy loss against the batch targets
    fn forward_classification(&self, item: Train<B>) -> ClassificationOutput<B> {
        let output = self.infer(item.input);
        let targets = item.targets.to_device(&output.device());

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }
}
