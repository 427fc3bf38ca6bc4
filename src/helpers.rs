//! Common Helper Functions
//!
//! Tensor plumbing shared by the data loader, the model and the tests.

use burn::module::{Module, ModuleVisitor, ParamId};
use burn::tensor::{backend::Backend, Int, Tensor, TensorData};

/// Creates a `[batch, seq_len]` Int tensor from row-major token ids.
pub fn create_batch_tensor<B: Backend>(
    flat: &[i32],
    shape: [usize; 2],
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    // Burn CUDA & WGPU backends typically use i32 for Int tensors
    let tensor_data = TensorData::new(flat.to_vec(), shape);
    Tensor::from_data(tensor_data, device)
}

/// `[batch, steps]` float mask: 1.0 where `t < length[b]`, 0.0 on padding.
pub fn length_mask<B: Backend>(lengths: &[usize], steps: usize, device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = lengths
        .iter()
        .flat_map(|&len| (0..steps).map(move |t| if t < len { 1.0 } else { 0.0 }))
        .collect();
    Tensor::from_data(TensorData::new(values, [lengths.len(), steps]), device)
}

/// Collects every float parameter value, in visiting order.
struct ParamCollector {
    values: Vec<f32>,
}

impl<B: Backend> ModuleVisitor<B> for ParamCollector {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.values.extend(tensor.to_data().iter::<f32>());
    }
}

/// Flat copy of all float parameters of a module.
pub fn parameter_snapshot<B: Backend, M: Module<B>>(module: &M) -> Vec<f32> {
    let mut collector = ParamCollector { values: Vec::new() };
    module.visit(&mut collector);
    collector.values
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    type B = NdArray;

    #[test]
    fn test_length_mask() {
        let mask = length_mask::<B>(&[2, 0, 3], 3, &NdArrayDevice::Cpu);
        let values: Vec<f32> = mask.into_data().iter::<f32>().collect();
        assert_eq!(values, vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_create_batch_tensor_shape() {
        let t = create_batch_tensor::<B>(&[1, 2, 3, 4, 5, 6], [2, 3], &NdArrayDevice::Cpu);
        assert_eq!(t.dims(), [2, 3]);
        let values: Vec<i64> = t.into_data().convert::<i64>().iter::<i64>().collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    }
}
