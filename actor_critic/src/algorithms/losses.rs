//! Masked policy and value losses.
//!
//! All policy losses take `[batch, time]` tensors and average over the valid
//! steps only: `-Σ(objective · mask) / Σ mask`. Advantages and old
//! log-probabilities are treated as constants.
//!
//! # Numerical Stability
//!
//! The PPO importance ratio is computed as `exp(log_ratio)` with the log ratio
//! clamped to [-20, 20]. Outside that band the clamp passes no gradient to the
//! log-probabilities.

use burn::tensor::{backend::Backend, Tensor};

/// Maximum log ratio before exp(); beyond it the ratio's gradient is zero.
const MAX_LOG_RATIO: f32 = 20.0;

/// `Σ(values · mask) / Σ mask` as a single-element tensor.
pub fn masked_mean<B: Backend, const D: usize>(
    values: Tensor<B, D>,
    mask: Tensor<B, D>,
) -> Tensor<B, 1> {
    (values * mask.clone()).sum() / mask.sum()
}

/// Advantage actor-critic loss.
///
/// L = -Σ(log π(a|s) · A · mask) / Σ mask
pub fn a2c_loss<B: Backend>(
    log_probs: Tensor<B, 2>,
    advantages: Tensor<B, 2>,
    mask: Tensor<B, 2>,
) -> Tensor<B, 1> {
    -masked_mean(log_probs * advantages, mask)
}

/// PPO clipped surrogate loss.
///
/// L = -Σ(min(r · A, clip(r, 1-ε, 1+ε) · A) · mask) / Σ mask,
/// where r = exp(log π(a|s) - log π_old(a|s)).
pub fn ppo_loss<B: Backend>(
    log_probs: Tensor<B, 2>,
    old_log_probs: Tensor<B, 2>,
    advantages: Tensor<B, 2>,
    mask: Tensor<B, 2>,
    epsilon: f32,
) -> Tensor<B, 1> {
    let ratio = (log_probs - old_log_probs)
        .clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO)
        .exp();
    let clipped_ratio = ratio.clone().clamp(1.0 - epsilon, 1.0 + epsilon);

    let unclipped = ratio * advantages.clone();
    let clipped = clipped_ratio * advantages;

    -masked_mean(unclipped.min_pair(clipped), mask)
}

/// Uncapped AWR weights `exp(A / β)`.
pub fn awr_weights<B: Backend>(advantages: Tensor<B, 2>, beta: f32) -> Tensor<B, 2> {
    advantages.div_scalar(beta).exp()
}

/// Advantage-weighted regression loss.
///
/// L = -Σ(log π(a|s) · min(exp(A / β), w_max) · mask) / Σ mask
pub fn awr_loss<B: Backend>(
    log_probs: Tensor<B, 2>,
    advantages: Tensor<B, 2>,
    mask: Tensor<B, 2>,
    beta: f32,
    w_max: f32,
) -> Tensor<B, 1> {
    let weights = awr_weights(advantages, beta).clamp_max(w_max);
    -masked_mean(log_probs * weights, mask)
}

/// Masked L2 regression loss on value predictions `[batch, time, 1]`.
pub fn value_loss<B: Backend>(
    predictions: Tensor<B, 3>,
    targets: Tensor<B, 3>,
    mask: Tensor<B, 3>,
) -> Tensor<B, 1> {
    masked_mean((predictions - targets).powf_scalar(2.0), mask)
}
