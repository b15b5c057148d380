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

    fn min_seq_length(&self) -> usize {
        self.min_seq_length
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

    use crate::{pipelines::text_classification::Model as _, utils::tensors::int_tensor};

    use super::{super::Config, *};

    type TestBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn padding_row_receives_no_gradient() {
        let device = Default::default();
        let model = Config::new(8, 3, 2, 0)
            .with_n_filters(2)
            .with_filter_sizes(vec![2])
            .with_dropout(0.0)
            .init::<TestBackend>(&device)
            .unwrap();

        let item = batcher::Train::new(
            batcher::Infer::new(
                int_tensor(vec![3, 4, 5, 0, 0, 0], [3, 2], &device),
                int_tensor(vec![3, 1], [2], &device),
            ),
            int_tensor(vec![1, 0], [2], &device),
        );

        let output = model.forward_classification(item);
        let grads = output.loss.backward();

        let grad = model
            .embedding
            .embedding
            .weight
            .grad(&grads)
            .expect("embedding weights have a gradient");

        let pad_row = grad.slice([0..1, 0..3]).into_data().convert::<f32>().value;
        assert_eq!(pad_row, vec![0.0, 0.0, 0.0]);
    }
}
