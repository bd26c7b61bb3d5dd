//! Coordination of the value and policy trainers.
//!
//! - [`actor_critic`]: the [`ActorCriticTrainer`] epoch loop
//! - [`schedule`]: evaluation rounds left in an epoch
//! - [`weight_sharing`]: shared-layer copies between trainers

pub mod actor_critic;
pub mod schedule;
pub mod weight_sharing;


pub use actor_critic::{ActorCriticTrainer, EpochSummary};
pub use schedule::remaining_evals;
pub use weight_sharing::copy_model_weights_and_state;
