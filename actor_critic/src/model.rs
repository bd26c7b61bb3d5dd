//! Model contracts for value and policy networks.
//!
//! Models are ordinary burn modules. The only extra knowledge the trainers
//! need is how the module's parameters (in traversal order) group into
//! layers, which is what shared-layer copies index into.

use burn::module::Module;
use burn::tensor::{backend::Backend, Tensor};

use crate::core::params::ModelParams;
use crate::error::ParamsError;

/// Whether a model is built for training or for inference only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    Train,
    Eval,
}

/// Input signature used to build the value-target model.
///
/// Observations carry a `[1, 1]` batch/time prefix; targets and mask are a
/// single value per step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueModelSignature {
    pub observations: Vec<usize>,
    pub targets: [usize; 3],
    pub mask: [usize; 3],
}

impl ValueModelSignature {
    pub fn from_observation_shape(observation_shape: &[usize]) -> Self {
        let mut observations = vec![1, 1];
        observations.extend_from_slice(observation_shape);
        Self {
            observations,
            targets: [1, 1, 1],
            mask: [1, 1, 1],
        }
    }

    /// Flattened size of one observation.
    pub fn observation_features(&self) -> usize {
        self.observations[2..].iter().product()
    }
}

/// A burn module whose parameters are grouped into an ordered list of layers.
pub trait LayeredModel<B: Backend>: Module<B> {
    /// Number of parameters of each layer, in traversal order.
    ///
    /// The counts must add up to the module's parameter count.
    fn layer_param_counts(&self) -> Vec<usize>;

    /// Non-trainable per-layer state (e.g. running statistics).
    fn layer_state(&self) -> ModelParams<B> {
        ModelParams::empty(self.layer_param_counts().len())
    }

    /// Replace the per-layer state.
    ///
    /// Stateless models accept only an all-empty snapshot.
    fn with_layer_state(self, state: ModelParams<B>) -> Result<Self, ParamsError> {
        let found = state.n_tensors();
        if found != 0 {
            return Err(ParamsError::Layout {
                expected_params: 0,
                found_params: found,
            });
        }
        Ok(self)
    }
}

/// Maps observations to one value per step.
pub trait ValueNetwork<B: Backend>: LayeredModel<B> {
    /// `[batch, time, obs_features] -> [batch, time, 1]`.
    fn forward(&self, observations: Tensor<B, 3>) -> Tensor<B, 3>;
}

/// Scores actions under the current policy.
pub trait PolicyNetwork<B: Backend>: LayeredModel<B> {
    /// Log-probabilities of `actions` given `observations`, `[batch, time]`.
    fn log_probs(&self, observations: Tensor<B, 3>, actions: Tensor<B, 3>) -> Tensor<B, 2>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_from_observation_shape() {
        let sig = ValueModelSignature::from_observation_shape(&[4, 2]);
        assert_eq!(sig.observations, vec![1, 1, 4, 2]);
        assert_eq!(sig.targets, [1, 1, 1]);
        assert_eq!(sig.mask, [1, 1, 1]);
        assert_eq!(sig.observation_features(), 8);
    }
}
