//! The supervised trainer contract used by the coordinator.

use std::path::PathBuf;

use burn::tensor::backend::Backend;

use crate::core::params::ModelParams;
use crate::error::{ActorCriticError, Result};

/// Owned stream of training batches. Building a batch may fail.
pub type BatchStream<I> = Box<dyn Iterator<Item = Result<I>>>;

/// Starts a fresh batch stream; called again whenever a stream ends.
pub type InputStreamProvider<I> = Box<dyn FnMut() -> BatchStream<I>>;

/// What the coordinator hands a trainer factory.
pub struct TrainerSetup<I> {
    pub inputs: InputStreamProvider<I>,
    /// Where the trainer keeps checkpoints and metrics, if anywhere.
    pub output_dir: Option<PathBuf>,
}

impl<I> TrainerSetup<I> {
    pub fn new(inputs: InputStreamProvider<I>, output_dir: Option<PathBuf>) -> Self {
        Self { inputs, output_dir }
    }
}

/// A trainer the coordinator can drive and copy weights between.
///
/// `step` counts gradient steps over the trainer's lifetime, including
/// steps restored from a checkpoint; the evaluation schedule is derived from
/// it.
pub trait SupervisedTrainer<B: Backend> {
    fn name(&self) -> &str;

    fn step(&self) -> usize;

    fn model_weights(&self) -> Result<ModelParams<B>>;

    fn set_model_weights(&mut self, weights: ModelParams<B>) -> Result<()>;

    fn model_state(&self) -> ModelParams<B>;

    fn set_model_state(&mut self, state: ModelParams<B>) -> Result<()>;

    /// Per-layer optimizer slots, if the trainer exposes them.
    fn optimizer_slots(&self) -> Option<ModelParams<B>> {
        None
    }

    fn set_optimizer_slots(&mut self, _slots: ModelParams<B>) -> Result<()> {
        Err(ActorCriticError::OptimizerSlotsUnsupported {
            trainer: self.name().to_string(),
        })
    }

    /// Run `steps` training steps followed by one evaluation of `eval_steps`
    /// batches. Advances `step` by exactly `steps`.
    fn train_epoch(&mut self, steps: usize, eval_steps: usize) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
