//! Value-model training batches.
//!
//! Targets are bootstrapped from the value-target model:
//!
//! ```text
//! V      = scale · V_target(obs)
//! A      = estimator(rewards, returns, V)          (time' <= time)
//! target = (V[:, :time'] + A) / scale
//! ```
//!
//! Dividing the scale back out keeps the regression targets on the scale of
//! raw returns.

use std::sync::Arc;

use burn::tensor::{backend::Backend, Tensor};

use crate::algorithms::advantages::AdvantageEstimator;
use crate::algorithms::inputs::{estimate_advantages, AdvantageContext};
use crate::batches::{value_estimates, ReplayWindow};
use crate::config::ActorCriticConfig;
use crate::core::matrix::StepMatrix;
use crate::core::trajectory::{time_prefix2, time_prefix3, SliceRequest, TrajectoryBatch};
use crate::core::value_target::ValueTarget;
use crate::error::Result;
use crate::model::ValueNetwork;
use crate::task::Task;
use crate::trainer::supervised::BatchStream;

/// One value training batch.
#[derive(Debug, Clone)]
pub struct ValueBatch<B: Backend> {
    /// [batch, time, obs_features]
    pub observations: Tensor<B, 3>,
    /// [batch, time, 1]
    pub targets: Tensor<B, 3>,
    /// [batch, time, 1]
    pub mask: Tensor<B, 3>,
}

/// Builds [`ValueBatch`]es from the task's trajectories.
pub struct ValueBatchBuilder<B: Backend, T, M> {
    task: Arc<T>,
    value_target: ValueTarget<B, M>,
    estimator: Arc<dyn AdvantageEstimator>,
    batch_size: usize,
    max_slice_length: usize,
    min_slice_length: usize,
    replay: ReplayWindow,
    n_extra_steps: usize,
    scale: f32,
}

impl<B: Backend, T, M> Clone for ValueBatchBuilder<B, T, M> {
    fn clone(&self) -> Self {
        Self {
            task: Arc::clone(&self.task),
            value_target: self.value_target.clone(),
            estimator: Arc::clone(&self.estimator),
            batch_size: self.batch_size,
            max_slice_length: self.max_slice_length,
            min_slice_length: self.min_slice_length,
            replay: self.replay,
            n_extra_steps: self.n_extra_steps,
            scale: self.scale,
        }
    }
}

impl<B, T, M> ValueBatchBuilder<B, T, M>
where
    B: Backend,
    T: Task<B>,
    M: ValueNetwork<B>,
{
    pub fn new(
        config: &ActorCriticConfig,
        task: Arc<T>,
        value_target: ValueTarget<B, M>,
        estimator: Arc<dyn AdvantageEstimator>,
        replay: ReplayWindow,
    ) -> Result<Self> {
        let scale = config.value_network_scale(task.gamma())?;
        Ok(Self {
            task,
            value_target,
            estimator,
            batch_size: config.value_batch_size,
            max_slice_length: config.total_slice_length(),
            min_slice_length: config.min_slice_length(),
            replay,
            n_extra_steps: config.added_policy_slice_length,
            scale,
        })
    }

    /// Factor applied to value-model outputs.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// The slice request sent to the task.
    pub fn request(&self) -> SliceRequest {
        SliceRequest {
            batch_size: self.batch_size,
            max_slice_length: self.max_slice_length,
            min_slice_length: Some(self.min_slice_length),
            epochs: self.replay.epochs(),
            include_final_state: false,
        }
    }

    /// Turn one trajectory batch into a value batch.
    pub fn build(&self, trajectory: TrajectoryBatch<B>) -> Result<ValueBatch<B>> {
        trajectory.validate()?;
        let values = value_estimates(&self.value_target, &trajectory, self.scale)?;
        let context = AdvantageContext {
            gamma: self.task.gamma(),
            n_extra_steps: self.n_extra_steps,
        };
        let advantages =
            estimate_advantages(self.estimator.as_ref(), &trajectory, &values, &context)?;

        let [batch, length] = advantages.shape();
        let values = values.truncate_cols(length);
        let targets = StepMatrix::new(
            batch,
            length,
            values
                .data()
                .iter()
                .zip(advantages.data())
                .map(|(v, a)| (v + a) / self.scale)
                .collect(),
        )?;

        let device = trajectory.device();
        Ok(ValueBatch {
            observations: time_prefix3(trajectory.observations, length),
            targets: targets.to_tensor(&device).reshape([batch, length, 1]),
            mask: time_prefix2(trajectory.mask, length).reshape([batch, length, 1]),
        })
    }
}

impl<B, T, M> ValueBatchBuilder<B, T, M>
where
    B: Backend + 'static,
    T: Task<B> + 'static,
    M: ValueNetwork<B> + 'static,
{
    /// Lazy stream of value batches over a fresh task stream.
    pub fn stream(&self) -> BatchStream<ValueBatch<B>> {
        let builder = self.clone();
        Box::new(
            self.task
                .trajectory_batch_stream(self.request())
                .map(move |trajectory| builder.build(trajectory)),
        )
    }
}
