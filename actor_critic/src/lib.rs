//! # Actor Critic: Dual Value/Policy Training on Burn
//!
//! Trains a policy network and a value network with two supervised trainers
//! that take turns on trajectories sampled from a [`Task`].
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      ActorCriticTrainer                           │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │   Task ──► trajectories ──┬──► ValueBatchBuilder ──► value trainer│
//! │                           │          ▲                    │       │
//! │                           │     ValueTarget ◄─ refresh ───┘       │
//! │                           │          ▼                            │
//! │                           └──► PolicyBatchBuilder ──► policy      │
//! │                                (advantages, A2C/PPO/AWR)  trainer │
//! │                                                                   │
//! │   shared layers: policy ──► value before value rounds,            │
//! │                  value ──► policy before policy rounds            │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each epoch resumes where the trainers' step counters left off, see
//! [`remaining_evals`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use actor_critic::{ActorCriticConfig, ActorCriticTrainer, PPO};
//!
//! let config = ActorCriticConfig::new()
//!     .with_value_batch_size(64)
//!     .with_policy_batch_size(64)
//!     .with_n_shared_layers(1);
//!
//! let mut trainer = ActorCriticTrainer::new(
//!     config,
//!     task,
//!     PPO::default(),
//!     |mode, signature| ValueNet::new(mode, signature, &device),
//!     |setup| build_value_trainer(setup),
//!     |setup| build_policy_trainer(setup),
//! )?;
//!
//! for epoch in 0..n_epochs {
//!     let summary = trainer.train_epoch(epoch, collected_state.clone())?;
//! }
//! trainer.close()?;
//! ```

pub mod algorithms;
pub mod batches;
pub mod checkpoint;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod metrics;
pub mod model;
pub mod scheduling;
pub mod task;
pub mod trainer;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use algorithms::{
    AdvantageEstimator, AdvantageSettings, Gae, MonteCarlo, PolicyAlgorithm, PolicyBatch,
    PolicyKind, PolicyLossPipeline, TdK, TdLambda, A2C, AWR, PPO,
};
pub use batches::{PolicyBatchBuilder, ReplayWindow, ValueBatch, ValueBatchBuilder};
pub use checkpoint::{Checkpointer, CheckpointerConfig};
pub use config::ActorCriticConfig;
pub use coordinator::{
    copy_model_weights_and_state, remaining_evals, ActorCriticTrainer, EpochSummary,
};
pub use core::{LayerParams, ModelParams, SliceRequest, StepMatrix, TrajectoryBatch, ValueTarget};
pub use error::{ActorCriticError, ConfigError, ParamsError, Result, ScheduleError, ShapeError};
pub use metrics::{CSVLogger, EvalSnapshot, LogLogger, MetricsLogger, MultiLogger};
pub use model::{LayeredModel, ModelMode, PolicyNetwork, ValueModelSignature, ValueNetwork};
pub use scheduling::{ConstantLR, LRScheduler, LinearDecay, Multifactor};
pub use task::{Task, TrajectoryStream};
pub use trainer::{
    policy_loss_fn, value_loss_fn, BurnTrainer, InputStreamProvider, SupervisedTrainer,
    TrainerSetup,
};
