//! Training batch builders.
//!
//! Both builders pull trajectory slices from the task, run the value-target
//! model on them and compute advantages; they differ in what they emit.
//!
//! ```text
//! task ──► TrajectoryBatch ──► value target ──► values ──► advantages
//!                                                   │
//!                    value:  (obs, values + A, mask) ┤
//!                    policy: algorithm.policy_inputs ┘
//! ```

pub mod policy;
pub mod value;


use burn::tensor::backend::Backend;

use crate::algorithms::algorithm::PolicyKind;
use crate::core::matrix::StepMatrix;
use crate::core::trajectory::TrajectoryBatch;
use crate::core::value_target::ValueTarget;
use crate::error::{ConfigError, Result, ShapeError};
use crate::model::ValueNetwork;

pub use policy::PolicyBatchBuilder;
pub use value::{ValueBatch, ValueBatchBuilder};

/// The most recent epochs batches are sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayWindow {
    n_epochs: usize,
}

impl ReplayWindow {
    /// On-policy algorithms only accept a window of one epoch.
    pub fn new(
        n_replay_epochs: usize,
        kind: PolicyKind,
        algorithm: &'static str,
    ) -> std::result::Result<Self, ConfigError> {
        if n_replay_epochs == 0 {
            return Err(ConfigError::InvalidCount {
                field: "n_replay_epochs",
                value: 0,
            });
        }
        if kind.is_on_policy() && n_replay_epochs != 1 {
            return Err(ConfigError::OnPolicyReplay {
                algorithm,
                n_replay_epochs,
            });
        }
        Ok(Self {
            n_epochs: n_replay_epochs,
        })
    }

    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    /// `[-1, -2, ..., -n]`, latest epoch first.
    pub fn epochs(&self) -> Vec<isize> {
        (1..=self.n_epochs).map(|e| -(e as isize)).collect()
    }
}

/// Scaled value estimates `[batch, time]` of the value-target model.
///
/// The model output must have a single trailing channel.
pub fn value_estimates<B, M>(
    value_target: &ValueTarget<B, M>,
    trajectory: &TrajectoryBatch<B>,
    scale: f32,
) -> Result<StepMatrix>
where
    B: Backend,
    M: ValueNetwork<B>,
{
    let values = value_target.predict(trajectory.observations.clone());
    let [batch, time, channels] = values.dims();
    if channels != 1 {
        return Err(ShapeError::ValueChannel {
            shape: [batch, time, channels],
        }
        .into());
    }
    let values = StepMatrix::from_tensor(values.reshape([batch, time]))?;
    Ok(if scale == 1.0 {
        values
    } else {
        values.map(|v| v * scale)
    })
}
