//! Policy-model training batches.

use std::sync::Arc;

use burn::tensor::backend::Backend;

use crate::algorithms::algorithm::PolicyAlgorithm;
use crate::algorithms::inputs::{AdvantageContext, PolicyBatch};
use crate::batches::{value_estimates, ReplayWindow};
use crate::config::ActorCriticConfig;
use crate::core::trajectory::{SliceRequest, TrajectoryBatch};
use crate::core::value_target::ValueTarget;
use crate::error::{Result, ShapeError};
use crate::model::ValueNetwork;
use crate::task::Task;
use crate::trainer::supervised::BatchStream;

/// Builds [`PolicyBatch`]es through the algorithm's policy-input hook.
///
/// Slices are `max_slice_length + added_policy_slice_length` long so that
/// multi-step estimators have lookahead past the trained steps.
pub struct PolicyBatchBuilder<B: Backend, T, M, A> {
    task: Arc<T>,
    value_target: ValueTarget<B, M>,
    algorithm: Arc<A>,
    batch_size: usize,
    max_slice_length: usize,
    min_slice_length: usize,
    replay: ReplayWindow,
    n_extra_steps: usize,
    scale: f32,
}

impl<B: Backend, T, M, A> Clone for PolicyBatchBuilder<B, T, M, A> {
    fn clone(&self) -> Self {
        Self {
            task: Arc::clone(&self.task),
            value_target: self.value_target.clone(),
            algorithm: Arc::clone(&self.algorithm),
            batch_size: self.batch_size,
            max_slice_length: self.max_slice_length,
            min_slice_length: self.min_slice_length,
            replay: self.replay,
            n_extra_steps: self.n_extra_steps,
            scale: self.scale,
        }
    }
}

impl<B, T, M, A> PolicyBatchBuilder<B, T, M, A>
where
    B: Backend,
    T: Task<B>,
    M: ValueNetwork<B>,
    A: PolicyAlgorithm<B>,
{
    pub fn new(
        config: &ActorCriticConfig,
        task: Arc<T>,
        value_target: ValueTarget<B, M>,
        algorithm: Arc<A>,
        replay: ReplayWindow,
    ) -> Result<Self> {
        let scale = config.value_network_scale(task.gamma())?;
        Ok(Self {
            task,
            value_target,
            algorithm,
            batch_size: config.policy_batch_size,
            max_slice_length: config.total_slice_length(),
            min_slice_length: config.min_slice_length(),
            replay,
            n_extra_steps: config.added_policy_slice_length,
            scale,
        })
    }

    pub fn request(&self) -> SliceRequest {
        SliceRequest {
            batch_size: self.batch_size,
            max_slice_length: self.max_slice_length,
            min_slice_length: Some(self.min_slice_length),
            epochs: self.replay.epochs(),
            include_final_state: false,
        }
    }

    /// Turn one trajectory batch into policy inputs.
    ///
    /// Fails when the task hands back a batch of the wrong size.
    pub fn build(&self, trajectory: TrajectoryBatch<B>) -> Result<PolicyBatch<B>> {
        trajectory.validate()?;
        let values = value_estimates(&self.value_target, &trajectory, self.scale)?;
        if values.rows() != self.batch_size {
            return Err(ShapeError::PolicyBatchSize {
                expected: self.batch_size,
                actual: values.rows(),
            }
            .into());
        }
        let context = AdvantageContext {
            gamma: self.task.gamma(),
            n_extra_steps: self.n_extra_steps,
        };
        self.algorithm.policy_inputs(&trajectory, &values, &context)
    }
}

impl<B, T, M, A> PolicyBatchBuilder<B, T, M, A>
where
    B: Backend + 'static,
    T: Task<B> + 'static,
    M: ValueNetwork<B> + 'static,
    A: PolicyAlgorithm<B> + 'static,
{
    pub fn stream(&self) -> BatchStream<PolicyBatch<B>> {
        let builder = self.clone();
        Box::new(
            self.task
                .trajectory_batch_stream(self.request())
                .map(move |trajectory| builder.build(trajectory)),
        )
    }
}
