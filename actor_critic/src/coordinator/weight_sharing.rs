//! Copy the shared-layer slice between trainers.

use std::ops::Range;

use burn::tensor::backend::Backend;

use crate::error::{ActorCriticError, Result};
use crate::trainer::supervised::SupervisedTrainer;

/// Copy layers `layers` of weights and state from `from` into `to`.
///
/// Layers outside the range keep their values. With `copy_optimizer_slots`
/// the same slice of optimizer slots is copied too; both trainers must
/// expose slots.
///
/// Everything is checked before `to` is modified, except that a failing
/// state or slot write leaves the earlier writes in place.
pub fn copy_model_weights_and_state<B, F, T>(
    layers: Range<usize>,
    from: &F,
    to: &mut T,
    copy_optimizer_slots: bool,
) -> Result<()>
where
    B: Backend,
    F: SupervisedTrainer<B> + ?Sized,
    T: SupervisedTrainer<B> + ?Sized,
{
    let mut weights = to.model_weights()?;
    weights.copy_layers_from(&from.model_weights()?, layers.clone())?;

    let mut state = to.model_state();
    state.copy_layers_from(&from.model_state(), layers.clone())?;

    let slots = if copy_optimizer_slots {
        let unsupported = |trainer: &str| ActorCriticError::OptimizerSlotsUnsupported {
            trainer: trainer.to_string(),
        };
        let source = from.optimizer_slots().ok_or_else(|| unsupported(from.name()))?;
        let mut slots = to.optimizer_slots().ok_or_else(|| unsupported(to.name()))?;
        slots.copy_layers_from(&source, layers.clone())?;
        Some(slots)
    } else {
        None
    };

    to.set_model_weights(weights)?;
    to.set_model_state(state)?;
    if let Some(slots) = slots {
        to.set_optimizer_slots(slots)?;
    }

    log::debug!(
        "copied layers {}..{} {} -> {}{}",
        layers.start,
        layers.end,
        from.name(),
        to.name(),
        if copy_optimizer_slots { " (with optimizer slots)" } else { "" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module_params::module_weights;
    use crate::error::ParamsError;
    use crate::testing::{EventLog, GaussianPolicy, RecordingTrainer, TinyValueNet, B};
    use crate::trainer::supervised::TrainerSetup;

    fn setup() -> TrainerSetup<()> {
        TrainerSetup::new(Box::new(|| Box::new(std::iter::empty())), None)
    }

    fn trainers(events: &EventLog) -> (RecordingTrainer<B, ()>, RecordingTrainer<B, ()>) {
        let device = Default::default();
        let value = RecordingTrainer::new(
            "value",
            &TinyValueNet::<B>::new(3, 4, &device),
            setup(),
            events.clone(),
        );
        let policy = RecordingTrainer::new(
            "policy",
            &GaussianPolicy::<B>::new(3, 4, 2, &device),
            setup(),
            events.clone(),
        );
        (value, policy)
    }

    #[test]
    fn test_copies_only_the_shared_prefix() {
        let events = EventLog::default();
        let (value, mut policy) = trainers(&events);
        let before = policy.model_weights().unwrap();

        copy_model_weights_and_state(0..1, &value, &mut policy, false).unwrap();

        let after = policy.model_weights().unwrap();
        let source = value.model_weights().unwrap();
        assert!(after.layers_equal(&source, 0..1).unwrap());
        assert!(after.layers_equal(&before, 1..2).unwrap());
        assert_eq!(
            *events.lock(),
            vec!["policy.set_weights".to_string(), "policy.set_state".to_string()]
        );
    }

    #[test]
    fn test_copy_is_idempotent() {
        let events = EventLog::default();
        let (value, mut policy) = trainers(&events);

        copy_model_weights_and_state(0..1, &value, &mut policy, false).unwrap();
        let once = policy.model_weights().unwrap();
        copy_model_weights_and_state(0..1, &value, &mut policy, false).unwrap();
        let twice = policy.model_weights().unwrap();

        assert!(once.layers_equal(&twice, 0..2).unwrap());
    }

    #[test]
    fn test_mismatched_layer_is_rejected_before_writing() {
        let events = EventLog::default();
        let (value, mut policy) = trainers(&events);

        // Layer 1 is [4, 1] + [1] in the value net, [4, 2] + [2] in the policy.
        let err = copy_model_weights_and_state(0..2, &value, &mut policy, false).unwrap_err();
        assert!(matches!(
            err,
            ActorCriticError::Params(ParamsError::LayerMismatch { layer: 1, .. })
        ));
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_range_past_the_model_is_rejected() {
        let events = EventLog::default();
        let (value, mut policy) = trainers(&events);
        let err = copy_model_weights_and_state(0..3, &value, &mut policy, false).unwrap_err();
        assert!(matches!(
            err,
            ActorCriticError::Params(ParamsError::LayerRange { .. })
        ));
    }

    #[test]
    fn test_optimizer_slots_require_support() {
        let events = EventLog::default();
        let (value, mut policy) = trainers(&events);
        let err = copy_model_weights_and_state(0..1, &value, &mut policy, true).unwrap_err();
        assert!(matches!(
            err,
            ActorCriticError::OptimizerSlotsUnsupported { ref trainer } if trainer == "value"
        ));
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_optimizer_slots_are_copied() {
        let events = EventLog::default();
        let device = Default::default();
        let (value, policy) = trainers(&events);
        let value_slots = module_weights(&TinyValueNet::<B>::new(3, 4, &device)).unwrap();
        let policy_slots = module_weights(&GaussianPolicy::<B>::new(3, 4, 2, &device)).unwrap();
        let value = value.with_slots(value_slots.clone());
        let mut policy = policy.with_slots(policy_slots.clone());

        copy_model_weights_and_state(0..1, &value, &mut policy, true).unwrap();

        let slots = policy.optimizer_slots().unwrap();
        assert!(slots.layers_equal(&value_slots, 0..1).unwrap());
        assert!(slots.layers_equal(&policy_slots, 1..2).unwrap());
        assert_eq!(events.lock().last().map(String::as_str), Some("policy.set_slots"));
    }
}
