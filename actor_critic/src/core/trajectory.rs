//! Trajectory batches sampled from a task.

use burn::tensor::{backend::Backend, Tensor};

use crate::error::ShapeError;

/// A fixed-size batch of time-major trajectory slices.
///
/// All fields share the same `[batch, time]` extents. `mask` is 1 for valid
/// steps and 0 for padding at the end of shorter slices.
#[derive(Debug, Clone)]
pub struct TrajectoryBatch<B: Backend> {
    /// Observations [batch, time, obs_features].
    pub observations: Tensor<B, 3>,
    /// Actions [batch, time, action_features].
    pub actions: Tensor<B, 3>,
    /// Rewards [batch, time].
    pub rewards: Tensor<B, 2>,
    /// Discounted returns computed by the task [batch, time].
    pub returns: Tensor<B, 2>,
    /// Log-probabilities of the actions under the collecting policy [batch, time].
    pub log_probs: Tensor<B, 2>,
    /// Validity mask [batch, time].
    pub mask: Tensor<B, 2>,
}

impl<B: Backend> TrajectoryBatch<B> {
    /// Number of slices in the batch.
    pub fn batch_size(&self) -> usize {
        self.rewards.dims()[0]
    }

    /// Time extent of the slices.
    pub fn length(&self) -> usize {
        self.rewards.dims()[1]
    }

    /// Device the batch lives on.
    pub fn device(&self) -> B::Device {
        self.rewards.device()
    }

    /// Check that every field agrees on `[batch, time]`.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let expected = self.rewards.dims();
        let leading = |dims: [usize; 3]| [dims[0], dims[1]];
        let fields = [
            ("observations", leading(self.observations.dims())),
            ("actions", leading(self.actions.dims())),
            ("returns", self.returns.dims()),
            ("log_probs", self.log_probs.dims()),
            ("mask", self.mask.dims()),
        ];
        for (field, actual) in fields {
            if actual != expected {
                return Err(ShapeError::Trajectory {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// First `len` time steps of a `[batch, time, features]` tensor.
///
/// Tensors already at most `len` long are returned unchanged.
pub fn time_prefix3<B: Backend>(tensor: Tensor<B, 3>, len: usize) -> Tensor<B, 3> {
    let [batch, time, features] = tensor.dims();
    if len >= time {
        return tensor;
    }
    tensor.slice([0..batch, 0..len, 0..features])
}

/// First `len` time steps of a `[batch, time]` tensor.
pub fn time_prefix2<B: Backend>(tensor: Tensor<B, 2>, len: usize) -> Tensor<B, 2> {
    let [batch, time] = tensor.dims();
    if len >= time {
        return tensor;
    }
    tensor.slice([0..batch, 0..len])
}

/// Parameters of a trajectory batch request to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRequest {
    /// Slices per batch.
    pub batch_size: usize,
    /// Longest slice to sample.
    pub max_slice_length: usize,
    /// Shortest slice to sample (`None`: the task's default).
    pub min_slice_length: Option<usize>,
    /// Epochs to sample from, as negative offsets (-1 is the latest).
    pub epochs: Vec<isize>,
    /// Whether slices may end on the final state of an episode.
    pub include_final_state: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type B = NdArray<f32>;

    fn batch(actions_time: usize) -> TrajectoryBatch<B> {
        let device = Default::default();
        TrajectoryBatch {
            observations: Tensor::zeros([2, 4, 3], &device),
            actions: Tensor::zeros([2, actions_time, 1], &device),
            rewards: Tensor::zeros([2, 4], &device),
            returns: Tensor::zeros([2, 4], &device),
            log_probs: Tensor::zeros([2, 4], &device),
            mask: Tensor::ones([2, 4], &device),
        }
    }

    #[test]
    fn test_extents() {
        let b = batch(4);
        assert_eq!(b.batch_size(), 2);
        assert_eq!(b.length(), 4);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_time_prefix() {
        let b = batch(4);
        assert_eq!(time_prefix3(b.observations.clone(), 2).dims(), [2, 2, 3]);
        assert_eq!(time_prefix3(b.observations, 9).dims(), [2, 4, 3]);
        assert_eq!(time_prefix2(b.mask, 1).dims(), [2, 1]);
    }

    #[test]
    fn test_validate_reports_mismatched_field() {
        let err = batch(3).validate().unwrap_err();
        assert_eq!(
            err,
            ShapeError::Trajectory {
                field: "actions",
                expected: [2, 4],
                actual: [2, 3],
            }
        );
    }
}
