use burn::{
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};

use crate::pipelines::text_classification::{self, batcher};

use super::Model;

impl<B: Backend> text_classification::Model<B> for Model<B> {
    fn infer(&self, input: batcher::Infer<B>) -> Tensor<B, 2> {
        self.forward(input.tokens, input.lengths)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn vocab_size(&self) -> usize {
        self.embedding.vocab_size()
    }
}

/// Define training step
impl<B: AutodiffBackend> TrainStep<batcher::Train<B>, ClassificationOutput<B>> for Model<B> {
    fn step(&self, item: batcher::Train<B>) -> TrainOutput<ClassificationOutput<B>> {
        // Run forward pass, calculate gradients and return them along with the output
        let output = text_classification::Model::forward_classification(self, item);
        let grads = output.loss.backward();

        TrainOutput::new(self, grads, output)
    }
}

/// Define validation step
impl<B: Backend> ValidStep<batcher::Train<B>, ClassificationOutput<B>> for Model<B> {
    fn step(&self, item: batcher::Train<B>) -> ClassificationOutput<B> {
        text_classification::Model::forward_classification(self, item)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};
    use pretty_assertions::assert_eq;

    use crate::utils::tensors::int_tensor;

    use super::{super::Config, *};

    type TestBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn training_step_produces_loss_and_gradients() {
        let device = Default::default();
        let model = Config::new(12, 2)
            .with_embedding_dim(4)
            .with_hidden_dim(3)
            .init::<TestBackend>(&device)
            .unwrap();

        let item = batcher::Train::new(
            batcher::Infer::new(
                int_tensor(vec![2, 3, 4, 5, 6, 0], [3, 2], &device),
                int_tensor(vec![3, 2], [2], &device),
            ),
            int_tensor(vec![1, 0], [2], &device),
        );

        let output = TrainStep::step(&model, item).item;

        assert_eq!(output.output.dims(), [2, 2]);
        let loss = output.loss.into_data().convert::<f32>().value[0];
        assert!(loss.is_finite() && loss > 0.0);
    }
}
