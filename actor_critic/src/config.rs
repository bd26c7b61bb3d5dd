//! Configuration for actor-critic training.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration of the dual value/policy trainer.
///
/// Algorithm-specific parameters (PPO epsilon, AWR beta, advantage
/// estimator and normalization) live on the algorithm itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorCriticConfig {
    // Value training
    /// Slices per value batch
    pub value_batch_size: usize,
    /// Value trainer steps per RL epoch
    pub value_train_steps_per_epoch: usize,
    /// Value trainer evaluations per RL epoch (only affects reporting)
    pub value_evals_per_epoch: usize,
    /// Batches per value evaluation
    pub value_eval_steps: usize,

    // Policy training
    /// Slices per policy batch
    pub policy_batch_size: usize,
    /// Policy trainer steps per RL epoch
    pub policy_train_steps_per_epoch: usize,
    /// Policy trainer evaluations per RL epoch
    pub policy_evals_per_epoch: usize,
    /// Batches per policy evaluation
    pub policy_eval_steps: usize,

    // Trajectory slicing
    /// Longest slice used for value training
    pub max_slice_length: usize,
    /// Extra steps added to slices so advantages can bootstrap past their end
    pub added_policy_slice_length: usize,
    /// Number of most recent epochs sampled from (off-policy only)
    pub n_replay_epochs: usize,
    /// Train the value model on targets scaled by `1 - gamma`
    pub scale_value_targets: bool,

    // Sharing
    /// Leading layers shared between the value and policy models
    pub n_shared_layers: usize,
    /// Also copy the shared slice of optimizer slots
    pub copy_optimizer_slots: bool,

    /// Root output directory; the value trainer writes to `<output_dir>/value`
    pub output_dir: Option<PathBuf>,
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self {
            value_batch_size: 64,
            value_train_steps_per_epoch: 500,
            value_evals_per_epoch: 1,
            value_eval_steps: 1,

            policy_batch_size: 64,
            policy_train_steps_per_epoch: 1,
            policy_evals_per_epoch: 1,
            policy_eval_steps: 1,

            max_slice_length: 1,
            added_policy_slice_length: 0,
            n_replay_epochs: 1,
            scale_value_targets: false,

            n_shared_layers: 0,
            copy_optimizer_slots: false,

            output_dir: None,
        }
    }
}

impl ActorCriticConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum slice length requested for both value and policy batches.
    pub fn total_slice_length(&self) -> usize {
        self.max_slice_length + self.added_policy_slice_length
    }

    /// Minimum slice length: enough steps left for the added TD horizon.
    pub fn min_slice_length(&self) -> usize {
        1 + self.added_policy_slice_length
    }

    /// Value trainer steps per evaluation round.
    pub fn value_steps_per_eval(&self) -> usize {
        self.value_train_steps_per_epoch / self.value_evals_per_epoch.max(1)
    }

    /// Policy trainer steps per evaluation round.
    pub fn policy_steps_per_eval(&self) -> usize {
        self.policy_train_steps_per_epoch / self.policy_evals_per_epoch.max(1)
    }

    /// Factor applied to value-model outputs before computing advantages.
    ///
    /// `1 / (1 - gamma)` when targets are scaled, otherwise 1.
    pub fn value_network_scale(&self, gamma: f32) -> Result<f32, ConfigError> {
        if !self.scale_value_targets {
            return Ok(1.0);
        }
        if !(0.0..1.0).contains(&gamma) {
            return Err(ConfigError::OutOfRange {
                field: "gamma (with scale_value_targets)",
                value: gamma,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(1.0 / (1.0 - gamma))
    }

    /// Validate all configuration parameters.
    ///
    /// # Validation Rules
    /// - Batch sizes, steps per epoch, evals per epoch, eval steps,
    ///   `max_slice_length` and `n_replay_epochs` must be > 0
    /// - evals per epoch must not exceed train steps per epoch
    /// - train steps per epoch must be a multiple of evals per epoch
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("value_batch_size", self.value_batch_size),
            ("value_train_steps_per_epoch", self.value_train_steps_per_epoch),
            ("value_evals_per_epoch", self.value_evals_per_epoch),
            ("value_eval_steps", self.value_eval_steps),
            ("policy_batch_size", self.policy_batch_size),
            ("policy_train_steps_per_epoch", self.policy_train_steps_per_epoch),
            ("policy_evals_per_epoch", self.policy_evals_per_epoch),
            ("policy_eval_steps", self.policy_eval_steps),
            ("max_slice_length", self.max_slice_length),
            ("n_replay_epochs", self.n_replay_epochs),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value });
            }
        }

        let splits = [
            ("value", self.value_train_steps_per_epoch, self.value_evals_per_epoch),
            ("policy", self.policy_train_steps_per_epoch, self.policy_evals_per_epoch),
        ];
        for (trainer, steps_per_epoch, evals_per_epoch) in splits {
            if evals_per_epoch > steps_per_epoch {
                return Err(ConfigError::InvalidEvalSplit {
                    trainer,
                    steps_per_epoch,
                    evals_per_epoch,
                });
            }
            // Rounds of a truncated split would leave each epoch short.
            if steps_per_epoch % evals_per_epoch != 0 {
                return Err(ConfigError::UnevenEvalSplit {
                    trainer,
                    steps_per_epoch,
                    evals_per_epoch,
                });
            }
        }

        Ok(())
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    // Builder methods for value training

    pub fn with_value_batch_size(mut self, size: usize) -> Self {
        self.value_batch_size = size;
        self
    }

    pub fn with_value_train_steps_per_epoch(mut self, steps: usize) -> Self {
        self.value_train_steps_per_epoch = steps;
        self
    }

    pub fn with_value_evals_per_epoch(mut self, evals: usize) -> Self {
        self.value_evals_per_epoch = evals;
        self
    }

    pub fn with_value_eval_steps(mut self, steps: usize) -> Self {
        self.value_eval_steps = steps;
        self
    }

    // Builder methods for policy training

    pub fn with_policy_batch_size(mut self, size: usize) -> Self {
        self.policy_batch_size = size;
        self
    }

    pub fn with_policy_train_steps_per_epoch(mut self, steps: usize) -> Self {
        self.policy_train_steps_per_epoch = steps;
        self
    }

    pub fn with_policy_evals_per_epoch(mut self, evals: usize) -> Self {
        self.policy_evals_per_epoch = evals;
        self
    }

    pub fn with_policy_eval_steps(mut self, steps: usize) -> Self {
        self.policy_eval_steps = steps;
        self
    }

    // Builder methods for slicing and sharing

    pub fn with_max_slice_length(mut self, length: usize) -> Self {
        self.max_slice_length = length;
        self
    }

    /// Set the extra slice length used for TD bootstrapping.
    pub fn with_added_policy_slice_length(mut self, length: usize) -> Self {
        self.added_policy_slice_length = length;
        self
    }

    /// Set how many recent epochs batches are sampled from.
    /// Must stay 1 for on-policy algorithms.
    pub fn with_n_replay_epochs(mut self, n: usize) -> Self {
        self.n_replay_epochs = n;
        self
    }

    pub fn with_scale_value_targets(mut self, scale: bool) -> Self {
        self.scale_value_targets = scale;
        self
    }

    /// Set the number of leading layers shared between value and policy.
    pub fn with_n_shared_layers(mut self, n: usize) -> Self {
        self.n_shared_layers = n;
        self
    }

    pub fn with_copy_optimizer_slots(mut self, copy: bool) -> Self {
        self.copy_optimizer_slots = copy;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}
