//! Supervised trainers.
//!
//! The coordinator only depends on [`SupervisedTrainer`]; [`BurnTrainer`] is
//! the implementation over burn modules and optimizers.

pub mod burn_trainer;
pub mod supervised;


pub use burn_trainer::{policy_loss_fn, value_loss_fn, BurnTrainer, LossFn, LossOutput};
pub use supervised::{BatchStream, InputStreamProvider, SupervisedTrainer, TrainerSetup};
