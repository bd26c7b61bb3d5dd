//! The policy loss pipeline.
//!
//! Stages run in a fixed order:
//!
//! ```text
//! PolicyBatch ──► log π(a|s) ──► normalize A (optional) ──► algorithm loss
//! ```
//!
//! Metrics are computed on the raw advantages.

use std::sync::Arc;

use burn::tensor::backend::Backend;

use crate::algorithms::algorithm::PolicyAlgorithm;
use crate::algorithms::inputs::PolicyBatch;
use crate::core::matrix::StepMatrix;
use crate::error::Result;
use crate::model::PolicyNetwork;
use crate::trainer::LossOutput;

/// `(A - mean(A)) / (std(A) + ε)` over the whole batch, padding included.
pub fn normalize_advantages(advantages: &StepMatrix, epsilon: f32) -> StepMatrix {
    let mean = advantages.mean();
    let std = advantages.std();
    advantages.map(|a| (a - mean) / (std + epsilon))
}

/// Composes a policy network and an algorithm into a training loss.
#[derive(Debug)]
pub struct PolicyLossPipeline<A> {
    algorithm: Arc<A>,
}

impl<A> Clone for PolicyLossPipeline<A> {
    fn clone(&self) -> Self {
        Self {
            algorithm: Arc::clone(&self.algorithm),
        }
    }
}

impl<A> PolicyLossPipeline<A> {
    pub fn new(algorithm: Arc<A>) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// Loss and metrics of `model` on one policy batch.
    pub fn loss<B, P>(&self, model: &P, batch: PolicyBatch<B>) -> Result<LossOutput<B>>
    where
        B: Backend,
        P: PolicyNetwork<B>,
        A: PolicyAlgorithm<B>,
    {
        let device = batch.advantages.device();
        let log_probs = model.log_probs(batch.observations, batch.actions);

        let raw = StepMatrix::from_tensor(batch.advantages)?;
        let advantages = match self.algorithm.normalization_epsilon() {
            Some(epsilon) => normalize_advantages(&raw, epsilon),
            None => raw.clone(),
        };

        let loss = self.algorithm.policy_loss_given_log_probs(
            log_probs,
            advantages.to_tensor(&device),
            batch.old_log_probs,
            batch.mask,
        );
        Ok(LossOutput {
            loss,
            metrics: self.algorithm.policy_metrics(&raw),
        })
    }
}
