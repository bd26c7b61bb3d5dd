//! Advantage estimators.
//!
//! An estimator maps per-step `rewards`, task-computed `returns` and value
//! estimates (all `[batch, time]`) to advantages `[batch, time']` with
//! `time' <= time`. Estimators that look ahead consume trailing steps, so
//! their output is shorter; callers truncate the other per-step tensors to
//! the returned length.
//!
//! # Estimators
//!
//! ```text
//! Monte Carlo:  A_t = G_t - V_t
//! TD(k):        A_t = Σ_{i<k} γ^i r_{t+i} + γ^k V_{t+k} - V_t
//! TD(λ):        R_t = r_t + γ((1-λ) V_{t+1} + λ R_{t+1}),  A_t = R_t - V_t
//! GAE(λ):       δ_t = r_t + γ V_{t+1} - V_t,  A_t = Σ_l (γλ)^l δ_{t+l}
//! ```

use std::fmt;

use crate::core::matrix::StepMatrix;

/// Default λ for TD(λ) and GAE.
pub const DEFAULT_LAMBDA: f32 = 0.95;

/// Maps rewards, returns and values to (possibly shorter) advantages.
///
/// `rewards`, `returns` and `values` share the same shape. The output has the
/// same number of rows and at most as many columns.
pub trait AdvantageEstimator: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(
        &self,
        rewards: &StepMatrix,
        returns: &StepMatrix,
        values: &StepMatrix,
        gamma: f32,
        n_extra_steps: usize,
    ) -> StepMatrix;
}

/// `returns - values`, dropping the `n_extra_steps` trailing steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonteCarlo;

impl AdvantageEstimator for MonteCarlo {
    fn name(&self) -> &'static str {
        "monte_carlo"
    }

    fn estimate(
        &self,
        _rewards: &StepMatrix,
        returns: &StepMatrix,
        values: &StepMatrix,
        _gamma: f32,
        n_extra_steps: usize,
    ) -> StepMatrix {
        let out_len = returns.cols().saturating_sub(n_extra_steps);
        let mut advantages = StepMatrix::zeros(returns.rows(), out_len);
        for b in 0..returns.rows() {
            for t in 0..out_len {
                advantages.set(b, t, returns.get(b, t) - values.get(b, t));
            }
        }
        advantages
    }
}

/// k-step temporal difference with `k = n_extra_steps`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TdK;

impl AdvantageEstimator for TdK {
    fn name(&self) -> &'static str {
        "td_k"
    }

    fn estimate(
        &self,
        rewards: &StepMatrix,
        _returns: &StepMatrix,
        values: &StepMatrix,
        gamma: f32,
        n_extra_steps: usize,
    ) -> StepMatrix {
        let k = n_extra_steps;
        let out_len = rewards.cols().saturating_sub(k);
        let mut advantages = StepMatrix::zeros(rewards.rows(), out_len);
        for b in 0..rewards.rows() {
            for t in 0..out_len {
                let mut discount = 1.0;
                let mut sum = 0.0;
                for i in 0..k {
                    sum += discount * rewards.get(b, t + i);
                    discount *= gamma;
                }
                let bootstrap = discount * values.get(b, t + k);
                advantages.set(b, t, sum + bootstrap - values.get(b, t));
            }
        }
        advantages
    }
}

/// TD(λ) returns minus values.
///
/// The recursion is anchored on the task's return at the last step of the
/// slice, then the `n_extra_steps` trailing steps are dropped.
#[derive(Debug, Clone, Copy)]
pub struct TdLambda {
    pub lambda: f32,
}

impl Default for TdLambda {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl AdvantageEstimator for TdLambda {
    fn name(&self) -> &'static str {
        "td_lambda"
    }

    fn estimate(
        &self,
        rewards: &StepMatrix,
        returns: &StepMatrix,
        values: &StepMatrix,
        gamma: f32,
        n_extra_steps: usize,
    ) -> StepMatrix {
        let (rows, cols) = (rewards.rows(), rewards.cols());
        let out_len = cols.saturating_sub(n_extra_steps);
        let mut advantages = StepMatrix::zeros(rows, out_len);
        if cols == 0 {
            return advantages;
        }

        let lambda = self.lambda;
        let mut td_returns = vec![0.0f32; cols];
        for b in 0..rows {
            td_returns[cols - 1] = returns.get(b, cols - 1);
            for t in (0..cols - 1).rev() {
                td_returns[t] = rewards.get(b, t)
                    + gamma * ((1.0 - lambda) * values.get(b, t + 1) + lambda * td_returns[t + 1]);
            }
            for t in 0..out_len {
                advantages.set(b, t, td_returns[t] - values.get(b, t));
            }
        }
        advantages
    }
}

/// Generalized advantage estimation.
///
/// The last step has no successor value to bootstrap from, so at least one
/// trailing step is always dropped.
#[derive(Debug, Clone, Copy)]
pub struct Gae {
    pub lambda: f32,
}

impl Default for Gae {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl AdvantageEstimator for Gae {
    fn name(&self) -> &'static str {
        "gae"
    }

    fn estimate(
        &self,
        rewards: &StepMatrix,
        _returns: &StepMatrix,
        values: &StepMatrix,
        gamma: f32,
        n_extra_steps: usize,
    ) -> StepMatrix {
        let (rows, cols) = (rewards.rows(), rewards.cols());
        let out_len = cols.saturating_sub(n_extra_steps.max(1));
        let mut advantages = StepMatrix::zeros(rows, out_len);
        if cols < 2 {
            return advantages;
        }

        let decay = gamma * self.lambda;
        for b in 0..rows {
            let mut running = 0.0;
            for t in (0..cols - 1).rev() {
                let delta = rewards.get(b, t) + gamma * values.get(b, t + 1) - values.get(b, t);
                running = delta + decay * running;
                if t < out_len {
                    advantages.set(b, t, running);
                }
            }
        }
        advantages
    }
}
