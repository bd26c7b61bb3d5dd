//! The task contract: a source of trajectory batches.

use burn::tensor::backend::Backend;

use crate::core::trajectory::{SliceRequest, TrajectoryBatch};

/// Lazy, owned stream of trajectory batches.
pub type TrajectoryStream<B> = Box<dyn Iterator<Item = TrajectoryBatch<B>>>;

/// An RL task that stores collected trajectories and samples slices of them.
///
/// Shared by both batch builders through an `Arc`; never mutated here.
pub trait Task<B: Backend> {
    /// Discount factor.
    fn gamma(&self) -> f32;

    /// Shape of a single observation.
    fn observation_shape(&self) -> Vec<usize>;

    /// Stream of batches sampled according to `request`.
    ///
    /// Each batch has `request.batch_size` slices and is at most
    /// `request.max_slice_length` long.
    fn trajectory_batch_stream(&self, request: SliceRequest) -> TrajectoryStream<B>;
}
