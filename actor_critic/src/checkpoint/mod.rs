//! Trainer checkpoints.
//!
//! Each evaluation round of a [`BurnTrainer`](crate::trainer::BurnTrainer)
//! with an output directory writes `model_{step:08}.bin` there. Only the most
//! recent checkpoints are kept; the latest one can be loaded back into a
//! module template to resume training.

pub mod checkpointer;

pub use checkpointer::{CheckpointError, CheckpointInfo, Checkpointer, CheckpointerConfig};
