//! Advantage-based policy inputs.
//!
//! Advantage estimators may return fewer time steps than the trajectory they
//! were given. Every per-step policy input is truncated to the advantage
//! length and then checked against it, so a misaligned estimator fails here
//! instead of silently training on shifted data.

use burn::tensor::{backend::Backend, Tensor};

use crate::algorithms::advantages::AdvantageEstimator;
use crate::core::matrix::StepMatrix;
use crate::core::trajectory::{time_prefix2, time_prefix3, TrajectoryBatch};
use crate::error::{Result, ShapeError};

/// Task-level parameters of an advantage computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvantageContext {
    pub gamma: f32,
    /// Trailing steps reserved for multi-step lookahead.
    pub n_extra_steps: usize,
}

/// Inputs of one policy training step, all time-aligned.
#[derive(Debug, Clone)]
pub struct PolicyBatch<B: Backend> {
    /// [batch, time, obs_features]
    pub observations: Tensor<B, 3>,
    /// [batch, time, action_features]
    pub actions: Tensor<B, 3>,
    /// [batch, time]
    pub advantages: Tensor<B, 2>,
    /// Log-probabilities under the collecting policy [batch, time]
    pub old_log_probs: Tensor<B, 2>,
    /// [batch, time]
    pub mask: Tensor<B, 2>,
}

/// Run `estimator` on a trajectory and check the result fits it.
///
/// The advantages must have the trajectory's batch size and must not be
/// longer than it.
pub fn estimate_advantages<B: Backend>(
    estimator: &dyn AdvantageEstimator,
    trajectory: &TrajectoryBatch<B>,
    values: &StepMatrix,
    context: &AdvantageContext,
) -> Result<StepMatrix> {
    let rewards = StepMatrix::from_tensor(trajectory.rewards.clone())?;
    let returns = StepMatrix::from_tensor(trajectory.returns.clone())?;

    let advantages = estimator.estimate(
        &rewards,
        &returns,
        values,
        context.gamma,
        context.n_extra_steps,
    );

    let trajectory_shape = rewards.shape();
    if advantages.rows() != trajectory_shape[0] || advantages.cols() > trajectory_shape[1] {
        return Err(ShapeError::Advantages {
            trajectory: trajectory_shape,
            advantages: advantages.shape(),
        }
        .into());
    }
    Ok(advantages)
}

/// Build policy inputs from the live trajectory and its value estimates.
pub fn advantage_policy_inputs<B: Backend>(
    estimator: &dyn AdvantageEstimator,
    trajectory: &TrajectoryBatch<B>,
    values: &StepMatrix,
    context: &AdvantageContext,
) -> Result<PolicyBatch<B>> {
    let advantages = estimate_advantages(estimator, trajectory, values, context)?;
    let length = advantages.cols();
    let expected = advantages.shape();

    let observations = time_prefix3(trajectory.observations.clone(), length);
    let actions = time_prefix3(trajectory.actions.clone(), length);
    let old_log_probs = time_prefix2(trajectory.log_probs.clone(), length);
    let mask = time_prefix2(trajectory.mask.clone(), length);

    let leading = |dims: [usize; 3]| [dims[0], dims[1]];
    let checks = [
        ("actions", leading(actions.dims())),
        ("observations", leading(observations.dims())),
        ("old_log_probs", old_log_probs.dims()),
        ("mask", mask.dims()),
    ];
    for (field, actual) in checks {
        if actual != expected {
            return Err(ShapeError::PolicyInput {
                field,
                expected,
                actual,
            }
            .into());
        }
    }

    Ok(PolicyBatch {
        observations,
        actions,
        advantages: advantages.to_tensor(&trajectory.device()),
        old_log_probs,
        mask,
    })
}
