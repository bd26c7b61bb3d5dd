//! Learning-rate schedules indexed by a trainer's global step.
//!
//! [`BurnTrainer`](crate::trainer::BurnTrainer) asks its schedule for the rate
//! of every gradient step. Because the step survives checkpoint restores, a
//! resumed value or policy trainer continues its schedule instead of
//! restarting the warm-up.
//!
//! ```rust,ignore
//! // Value trainer: warm up over 400 steps, then decay as 1/sqrt(step).
//! let value_lr = Multifactor::new(0.1, 400);
//! // Policy trainer: fixed rate.
//! let policy_lr = ConstantLR::new(3e-4);
//! ```

pub mod lr_scheduler;


pub use lr_scheduler::{ConstantLR, LRFactor, LRScheduler, LinearDecay, Multifactor};
