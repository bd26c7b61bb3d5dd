//! Actor-critic algorithms.
//!
//! - [`advantages`]: pluggable advantage estimators (MC, TD(k), TD(λ), GAE)
//! - [`inputs`]: advantage-based policy inputs with time-alignment checks
//! - [`losses`]: masked A2C / PPO / AWR / value losses
//! - [`algorithm`]: the [`PolicyAlgorithm`] hooks and the shipped algorithms
//! - [`pipeline`]: log-prob → normalization → loss composition

pub mod advantages;
pub mod algorithm;
pub mod inputs;
pub mod losses;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use advantages::{AdvantageEstimator, Gae, MonteCarlo, TdK, TdLambda, DEFAULT_LAMBDA};
pub use algorithm::{AdvantageSettings, PolicyAlgorithm, PolicyKind, A2C, AWR, PPO};
pub use inputs::{advantage_policy_inputs, estimate_advantages, AdvantageContext, PolicyBatch};
pub use losses::{a2c_loss, awr_loss, awr_weights, masked_mean, ppo_loss, value_loss};
pub use pipeline::{normalize_advantages, PolicyLossPipeline};
