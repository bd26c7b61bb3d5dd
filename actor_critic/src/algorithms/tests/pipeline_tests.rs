//! The policy loss pipeline: log-probs, normalization, loss, metrics.

use std::sync::Arc;

use burn::prelude::*;
use burn::tensor::ElementConversion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::algorithms::algorithm::{AdvantageSettings, PolicyAlgorithm, A2C, AWR, PPO};
use crate::algorithms::inputs::PolicyBatch;
use crate::algorithms::losses::a2c_loss;
use crate::algorithms::pipeline::{normalize_advantages, PolicyLossPipeline};
use crate::algorithms::tests::{assert_close, scalar, tensor2};
use crate::core::matrix::StepMatrix;
use crate::model::PolicyNetwork;
use crate::testing::{GaussianPolicy, B};

const OBS: usize = 3;
const ACT: usize = 2;

fn policy() -> GaussianPolicy<B> {
    GaussianPolicy::new(OBS, 4, ACT, &Default::default())
}

fn batch(advantages: &[f32]) -> PolicyBatch<B> {
    let device = Default::default();
    let time = advantages.len();
    PolicyBatch {
        observations: Tensor::ones([1, time, OBS], &device),
        actions: Tensor::zeros([1, time, ACT], &device),
        advantages: tensor2(&[advantages.to_vec()]),
        old_log_probs: Tensor::zeros([1, time], &device),
        mask: Tensor::ones([1, time], &device),
    }
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_normalized_advantages_have_zero_mean_unit_std() {
    let raw = StepMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    let normalized = normalize_advantages(&raw, 1e-5);
    assert!(normalized.mean().abs() < 1e-5);
    assert!((normalized.std() - 1.0).abs() < 1e-3);
}

#[test]
fn test_normalization_of_random_advantages() {
    let mut rng = StdRng::seed_from_u64(7);
    let rows: Vec<Vec<f32>> = (0..4)
        .map(|_| (0..16).map(|_| rng.gen_range(-50.0..50.0)).collect())
        .collect();
    let raw = StepMatrix::from_rows(&rows).unwrap();

    let normalized = normalize_advantages(&raw, 1e-5);

    assert_eq!(normalized.shape(), raw.shape());
    assert!(normalized.mean().abs() < 1e-4);
    assert!((normalized.std() - 1.0).abs() < 1e-3);
}

#[test]
fn test_constant_advantages_normalize_to_zero() {
    let raw = StepMatrix::from_rows(&[vec![3.0, 3.0, 3.0]]).unwrap();
    let normalized = normalize_advantages(&raw, 1e-5);
    assert_close(normalized.data(), &[0.0, 0.0, 0.0]);
}

// ============================================================================
// Loss
// ============================================================================

#[test]
fn test_pipeline_normalizes_before_the_loss() {
    let policy = policy();
    let raw = [1.0, 2.0, 3.0, 4.0];
    let pipeline = PolicyLossPipeline::new(Arc::new(A2C::new()));

    let output = pipeline.loss(&policy, batch(&raw)).unwrap();

    let b = batch(&raw);
    let log_probs = policy.log_probs(b.observations, b.actions);
    let normalized = normalize_advantages(&StepMatrix::from_rows(&[raw.to_vec()]).unwrap(), 1e-5);
    let expected = a2c_loss(log_probs, normalized.to_tensor(&Default::default()), b.mask);
    assert!((scalar(output.loss) - scalar(expected)).abs() < 1e-5);
}

#[test]
fn test_pipeline_without_normalization_uses_raw_advantages() {
    let policy = policy();
    let raw = [1.0, 2.0, 3.0];
    let algorithm = A2C::new().with_advantages(AdvantageSettings::new().with_normalization(false));
    let pipeline = PolicyLossPipeline::new(Arc::new(algorithm));

    let output = pipeline.loss(&policy, batch(&raw)).unwrap();

    let b = batch(&raw);
    let log_probs: Vec<f32> = policy
        .log_probs(b.observations, b.actions)
        .into_data()
        .to_vec()
        .unwrap();
    // -Σ(logp · A) / 3
    let expected = -log_probs.iter().zip(raw).map(|(lp, a)| lp * a).sum::<f32>() / 3.0;
    assert!((scalar(output.loss) - expected).abs() < 1e-4);
}

#[test]
fn test_normalization_epsilon_hook() {
    let on = A2C::new();
    let off = A2C::new().with_advantages(AdvantageSettings::new().with_normalization(false));
    assert_eq!(<A2C as PolicyAlgorithm<B>>::normalization_epsilon(&on), Some(1e-5));
    assert_eq!(<A2C as PolicyAlgorithm<B>>::normalization_epsilon(&off), None);
}

#[test]
fn test_ppo_pipeline_loss_is_finite_and_differentiable() {
    use crate::testing::AB;

    let device = Default::default();
    let policy = GaussianPolicy::<AB>::new(OBS, 4, ACT, &device);
    let batch = PolicyBatch::<AB> {
        observations: Tensor::ones([2, 3, OBS], &device),
        actions: Tensor::zeros([2, 3, ACT], &device),
        advantages: Tensor::from_data(
            TensorData::new(vec![1.0f32, -1.0, 0.5, 2.0, 0.0, -0.5], [2, 3]),
            &device,
        ),
        old_log_probs: Tensor::full([2, 3], -2.0, &device),
        mask: Tensor::ones([2, 3], &device),
    };
    let pipeline = PolicyLossPipeline::new(Arc::new(PPO::default()));

    let output = pipeline.loss(&policy, batch).unwrap();
    let value = output.loss.clone().into_scalar().elem::<f32>();
    assert!(value.is_finite());

    let grads = output.loss.backward();
    assert!(policy.head.weight.val().grad(&grads).is_some());
}

// ============================================================================
// Metrics
// ============================================================================

#[test]
fn test_metrics_use_raw_advantages() {
    let pipeline = PolicyLossPipeline::new(Arc::new(A2C::new()));
    let output = pipeline.loss(&policy(), batch(&[1.0, 3.0])).unwrap();

    assert!((output.metrics["advantage_mean"] - 2.0).abs() < 1e-6);
    assert!((output.metrics["advantage_std"] - 1.0).abs() < 1e-6);
}

#[test]
fn test_awr_metrics_report_uncapped_weights() {
    let awr = AWR::new(1.0, 20.0);
    let advantages = StepMatrix::from_rows(&[vec![0.0, 10.0]]).unwrap();

    let metrics = <AWR as PolicyAlgorithm<B>>::policy_metrics(&awr, &advantages);

    assert!((metrics["awr_weight_min"] - 1.0).abs() < 1e-6);
    assert!((metrics["awr_weight_max"] - 10.0f32.exp()).abs() < 1.0);
    assert!(metrics["awr_weight_max"] > 20.0);
    assert!(metrics.contains_key("awr_weight_mean"));
    assert!(metrics.contains_key("awr_weight_std"));
    assert!(metrics.contains_key("advantage_mean"));
}

#[test]
fn test_algorithm_kinds() {
    assert!(<A2C as PolicyAlgorithm<B>>::policy_kind(&A2C::new()).is_on_policy());
    assert!(<PPO as PolicyAlgorithm<B>>::policy_kind(&PPO::default()).is_on_policy());
    assert!(!<AWR as PolicyAlgorithm<B>>::policy_kind(&AWR::default()).is_on_policy());
}
