//! Policy algorithms: A2C, PPO and AWR.
//!
//! An algorithm decides three things: how trajectories become policy inputs
//! (advantage-based for all shipped algorithms), the loss given the current
//! policy's log-probabilities, and which metrics to report. The surrounding
//! stages (log-prob computation, advantage normalization) are fixed and live
//! in [`PolicyLossPipeline`](crate::algorithms::pipeline::PolicyLossPipeline).

use std::collections::BTreeMap;
use std::sync::Arc;

use burn::tensor::{backend::Backend, Tensor};

use crate::algorithms::advantages::{AdvantageEstimator, TdLambda};
use crate::algorithms::inputs::{advantage_policy_inputs, AdvantageContext, PolicyBatch};
use crate::algorithms::losses::{a2c_loss, awr_loss, ppo_loss};
use crate::core::matrix::StepMatrix;
use crate::core::trajectory::TrajectoryBatch;
use crate::error::Result;

/// Whether an algorithm may train on data from older policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Trains only on the latest epoch.
    OnPolicy,
    /// May replay several recent epochs.
    OffPolicy,
}

impl PolicyKind {
    pub fn is_on_policy(self) -> bool {
        self == PolicyKind::OnPolicy
    }
}

// ============================================================================
// Advantage settings
// ============================================================================

/// Advantage estimator and normalization shared by all shipped algorithms.
#[derive(Debug, Clone)]
pub struct AdvantageSettings {
    pub estimator: Arc<dyn AdvantageEstimator>,
    /// Normalize advantages to zero mean and unit std before the loss.
    pub normalization: bool,
    pub normalization_epsilon: f32,
}

impl Default for AdvantageSettings {
    fn default() -> Self {
        Self {
            estimator: Arc::new(TdLambda::default()),
            normalization: true,
            normalization_epsilon: 1e-5,
        }
    }
}

impl AdvantageSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_estimator(mut self, estimator: impl AdvantageEstimator + 'static) -> Self {
        self.estimator = Arc::new(estimator);
        self
    }

    pub fn with_normalization(mut self, normalization: bool) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_normalization_epsilon(mut self, epsilon: f32) -> Self {
        self.normalization_epsilon = epsilon;
        self
    }
}

// ============================================================================
// PolicyAlgorithm trait
// ============================================================================

/// Algorithm-specific hooks of an actor-critic trainer.
pub trait PolicyAlgorithm<B: Backend> {
    fn name(&self) -> &'static str;

    fn policy_kind(&self) -> PolicyKind;

    fn advantage_settings(&self) -> &AdvantageSettings;

    fn advantage_estimator(&self) -> Arc<dyn AdvantageEstimator> {
        Arc::clone(&self.advantage_settings().estimator)
    }

    /// Epsilon of advantage normalization, `None` when disabled.
    fn normalization_epsilon(&self) -> Option<f32> {
        let settings = self.advantage_settings();
        settings
            .normalization
            .then_some(settings.normalization_epsilon)
    }

    /// Policy inputs for one trajectory batch and its value estimates.
    fn policy_inputs(
        &self,
        trajectory: &TrajectoryBatch<B>,
        values: &StepMatrix,
        context: &AdvantageContext,
    ) -> Result<PolicyBatch<B>> {
        advantage_policy_inputs(
            self.advantage_settings().estimator.as_ref(),
            trajectory,
            values,
            context,
        )
    }

    /// Scalar loss from current log-probs, advantages, old log-probs and mask.
    fn policy_loss_given_log_probs(
        &self,
        log_probs: Tensor<B, 2>,
        advantages: Tensor<B, 2>,
        old_log_probs: Tensor<B, 2>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1>;

    /// Metrics over the raw (unnormalized) advantages of a batch.
    fn policy_metrics(&self, advantages: &StepMatrix) -> BTreeMap<String, f32> {
        BTreeMap::from([
            ("advantage_mean".to_string(), advantages.mean()),
            ("advantage_std".to_string(), advantages.std()),
        ])
    }
}

// ============================================================================
// A2C
// ============================================================================

/// Advantage actor-critic. On-policy.
#[derive(Debug, Clone, Default)]
pub struct A2C {
    pub advantages: AdvantageSettings,
}

impl A2C {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_advantages(mut self, advantages: AdvantageSettings) -> Self {
        self.advantages = advantages;
        self
    }
}

impl<B: Backend> PolicyAlgorithm<B> for A2C {
    fn name(&self) -> &'static str {
        "a2c"
    }

    fn policy_kind(&self) -> PolicyKind {
        PolicyKind::OnPolicy
    }

    fn advantage_settings(&self) -> &AdvantageSettings {
        &self.advantages
    }

    fn policy_loss_given_log_probs(
        &self,
        log_probs: Tensor<B, 2>,
        advantages: Tensor<B, 2>,
        _old_log_probs: Tensor<B, 2>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        a2c_loss(log_probs, advantages, mask)
    }
}

// ============================================================================
// PPO
// ============================================================================

/// Proximal policy optimization with a clipped ratio. On-policy.
#[derive(Debug, Clone)]
pub struct PPO {
    /// Clipping range of the probability ratio.
    pub epsilon: f32,
    pub advantages: AdvantageSettings,
}

impl Default for PPO {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            advantages: AdvantageSettings::default(),
        }
    }
}

impl PPO {
    pub fn new(epsilon: f32) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }

    pub fn with_advantages(mut self, advantages: AdvantageSettings) -> Self {
        self.advantages = advantages;
        self
    }
}

impl<B: Backend> PolicyAlgorithm<B> for PPO {
    fn name(&self) -> &'static str {
        "ppo"
    }

    fn policy_kind(&self) -> PolicyKind {
        PolicyKind::OnPolicy
    }

    fn advantage_settings(&self) -> &AdvantageSettings {
        &self.advantages
    }

    fn policy_loss_given_log_probs(
        &self,
        log_probs: Tensor<B, 2>,
        advantages: Tensor<B, 2>,
        old_log_probs: Tensor<B, 2>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        ppo_loss(log_probs, old_log_probs, advantages, mask, self.epsilon)
    }
}

// ============================================================================
// AWR
// ============================================================================

/// Advantage-weighted regression. Off-policy.
#[derive(Debug, Clone)]
pub struct AWR {
    /// Temperature of the advantage weights.
    pub beta: f32,
    /// Cap on the advantage weights.
    pub w_max: f32,
    pub advantages: AdvantageSettings,
}

impl Default for AWR {
    fn default() -> Self {
        Self {
            beta: 1.0,
            w_max: 20.0,
            advantages: AdvantageSettings::default(),
        }
    }
}

impl AWR {
    pub fn new(beta: f32, w_max: f32) -> Self {
        Self {
            beta,
            w_max,
            ..Self::default()
        }
    }

    pub fn with_advantages(mut self, advantages: AdvantageSettings) -> Self {
        self.advantages = advantages;
        self
    }
}

impl<B: Backend> PolicyAlgorithm<B> for AWR {
    fn name(&self) -> &'static str {
        "awr"
    }

    fn policy_kind(&self) -> PolicyKind {
        PolicyKind::OffPolicy
    }

    fn advantage_settings(&self) -> &AdvantageSettings {
        &self.advantages
    }

    fn policy_loss_given_log_probs(
        &self,
        log_probs: Tensor<B, 2>,
        advantages: Tensor<B, 2>,
        _old_log_probs: Tensor<B, 2>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        awr_loss(log_probs, advantages, mask, self.beta, self.w_max)
    }

    fn policy_metrics(&self, advantages: &StepMatrix) -> BTreeMap<String, f32> {
        let mut metrics = BTreeMap::from([
            ("advantage_mean".to_string(), advantages.mean()),
            ("advantage_std".to_string(), advantages.std()),
        ]);

        let weights = advantages.map(|a| (a / self.beta).exp());
        let min = weights.data().iter().copied().fold(f32::INFINITY, f32::min);
        let max = weights
            .data()
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        metrics.insert("awr_weight_mean".to_string(), weights.mean());
        metrics.insert("awr_weight_std".to_string(), weights.std());
        metrics.insert("awr_weight_min".to_string(), min);
        metrics.insert("awr_weight_max".to_string(), max);
        metrics
    }
}
