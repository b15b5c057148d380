use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Pad a list of token id sequences into a time-major tensor of shape `[seq_length, batch_size]`.
/// Sequences longer than `seq_length` are truncated.
pub fn pad_time_major<B: Backend>(
    pad_token: usize,
    tokens_list: &[Vec<usize>],
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = tokens_list.len();
    let mut values = vec![pad_token; seq_length * batch_size];

    for (column, tokens) in tokens_list.iter().enumerate() {
        for (row, token) in tokens.iter().take(seq_length).enumerate() {
            values[row * batch_size + column] = *token;
        }
    }

    int_tensor(values, [seq_length, batch_size], device)
}

/// Indices `[len - 1, ..., 1, 0]` for reversing a tensor along a dimension with `select`
pub fn reversed_indices<B: Backend>(len: usize, device: &B::Device) -> Tensor<B, 1, Int> {
    int_tensor((0..len).rev().collect(), [len], device)
}

/// Build an integer tensor from a flat list of values
pub fn int_tensor<B: Backend, const D: usize>(
    values: Vec<usize>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Int> {
    let data = Data::<B::IntElem, D>::new(
        values.into_iter().map(|e| (e as i64).elem()).collect(),
        Shape::new(shape),
    );

    Tensor::from_data(data, device)
}
