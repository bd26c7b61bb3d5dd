//! Shared slot for the value-target model.
//!
//! The value-target model computes the value estimates used to build both
//! value targets and policy advantages. It is never trained: the coordinator
//! refreshes it from the value trainer's weights and state, and the batch
//! streams read it through cloned handles. Every refresh bumps the version.

use std::marker::PhantomData;
use std::sync::Arc;

use burn::tensor::{backend::Backend, Tensor};
use parking_lot::Mutex;

use crate::core::module_params::{load_module_weights, module_weights};
use crate::core::params::ModelParams;
use crate::error::ParamsError;
use crate::model::ValueNetwork;

struct TargetState<M> {
    model: M,
    version: u64,
}

/// Cloneable handle to the value-target model.
pub struct ValueTarget<B: Backend, M> {
    slot: Arc<Mutex<TargetState<M>>>,
    _backend: PhantomData<B>,
}

impl<B: Backend, M> Clone for ValueTarget<B, M> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            _backend: PhantomData,
        }
    }
}

impl<B: Backend, M: ValueNetwork<B>> ValueTarget<B, M> {
    /// Wrap a freshly built model, with gradients disabled.
    pub fn new(model: M) -> Self {
        Self {
            slot: Arc::new(Mutex::new(TargetState {
                model: model.no_grad(),
                version: 0,
            })),
            _backend: PhantomData,
        }
    }

    /// Load new weights and state; returns the new version.
    ///
    /// On error the slot keeps its previous model and version.
    pub fn refresh(
        &self,
        weights: &ModelParams<B>,
        state: &ModelParams<B>,
    ) -> Result<u64, ParamsError> {
        let mut guard = self.slot.lock();
        let model = load_module_weights(guard.model.clone(), weights)?
            .with_layer_state(state.clone())?
            .no_grad();
        guard.model = model;
        guard.version += 1;
        Ok(guard.version)
    }

    /// Value estimates `[batch, time, 1]`, detached from any graph.
    pub fn predict(&self, observations: Tensor<B, 3>) -> Tensor<B, 3> {
        self.slot.lock().model.forward(observations).detach()
    }

    /// Number of refreshes so far.
    pub fn version(&self) -> u64 {
        self.slot.lock().version
    }

    /// Current weights of the target model.
    pub fn weights(&self) -> Result<ModelParams<B>, ParamsError> {
        module_weights(&self.slot.lock().model)
    }

    /// Current per-layer state of the target model.
    pub fn state(&self) -> ModelParams<B> {
        self.slot.lock().model.layer_state()
    }
}
