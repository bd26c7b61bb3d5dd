//! Evaluation rounds left in an epoch, derived from a trainer's step.
//!
//! Trainers count steps over their whole lifetime and restore the count from
//! checkpoints, so after a restart the coordinator can tell how much of the
//! current epoch already ran without keeping any state of its own.

use crate::error::ScheduleError;

/// Evaluation rounds still to run in epoch `epoch_index` (0-based).
///
/// Each round is `steps_per_epoch / evals_per_epoch` steps; the split must be
/// exact. Steps done in this epoch must be a whole number of rounds. Returns 0
/// once the epoch is complete, also when the trainer is already past it.
///
/// ```text
/// steps_per_epoch = 100, evals_per_epoch = 4  ->  25 steps per round
///
/// epoch 2, step 200  ->  4
/// epoch 2, step 250  ->  2
/// epoch 2, step 300  ->  0
/// epoch 2, step 210  ->  MisalignedStep
/// ```
pub fn remaining_evals(
    current_step: usize,
    epoch_index: usize,
    steps_per_epoch: usize,
    evals_per_epoch: usize,
) -> Result<usize, ScheduleError> {
    let epoch_start = epoch_index * steps_per_epoch;
    let done_steps = current_step
        .checked_sub(epoch_start)
        .ok_or(ScheduleError::StepBehindEpoch {
            current_step,
            epoch_start,
        })?;

    let steps_per_eval = steps_per_epoch
        .checked_div(evals_per_epoch)
        .filter(|&n| n > 0)
        .ok_or(ScheduleError::ZeroStepsPerEval {
            steps_per_epoch,
            evals_per_epoch,
        })?;

    if steps_per_epoch % evals_per_epoch != 0 {
        return Err(ScheduleError::UnevenEvalSplit {
            steps_per_epoch,
            evals_per_epoch,
        });
    }

    if done_steps % steps_per_eval != 0 {
        return Err(ScheduleError::MisalignedStep {
            done_steps,
            steps_per_eval,
        });
    }

    Ok(evals_per_epoch.saturating_sub(done_steps / steps_per_eval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fresh_epoch_runs_all_evals() {
        assert_eq!(remaining_evals(0, 0, 100, 4), Ok(4));
        assert_eq!(remaining_evals(200, 2, 100, 4), Ok(4));
    }

    #[test]
    fn test_partial_epoch() {
        assert_eq!(remaining_evals(250, 2, 100, 4), Ok(2));
        assert_eq!(remaining_evals(275, 2, 100, 4), Ok(1));
    }

    #[test]
    fn test_finished_and_overshot_epochs() {
        assert_eq!(remaining_evals(300, 2, 100, 4), Ok(0));
        assert_eq!(remaining_evals(500, 2, 100, 4), Ok(0));
    }

    #[test]
    fn test_step_behind_epoch() {
        assert_eq!(
            remaining_evals(150, 2, 100, 4),
            Err(ScheduleError::StepBehindEpoch {
                current_step: 150,
                epoch_start: 200
            })
        );
    }

    #[test]
    fn test_misaligned_step() {
        assert_eq!(
            remaining_evals(210, 2, 100, 4),
            Err(ScheduleError::MisalignedStep {
                done_steps: 10,
                steps_per_eval: 25
            })
        );
    }

    #[test]
    fn test_zero_steps_per_eval() {
        assert!(matches!(
            remaining_evals(0, 0, 3, 4),
            Err(ScheduleError::ZeroStepsPerEval { .. })
        ));
        assert!(matches!(
            remaining_evals(0, 0, 3, 0),
            Err(ScheduleError::ZeroStepsPerEval { .. })
        ));
    }

    #[test]
    fn test_uneven_split_is_rejected() {
        // 10 / 3 rounds would run 9 steps per epoch, never reaching step 10.
        assert_eq!(
            remaining_evals(3, 0, 10, 3),
            Err(ScheduleError::UnevenEvalSplit {
                steps_per_epoch: 10,
                evals_per_epoch: 3,
            })
        );
        assert_eq!(
            remaining_evals(9, 1, 10, 3),
            Err(ScheduleError::StepBehindEpoch {
                current_step: 9,
                epoch_start: 10,
            })
        );
    }

    proptest! {
        #[test]
        fn prop_rounds_done_plus_remaining_is_total(
            epoch in 0usize..50,
            per_eval in 1usize..50,
            evals in 1usize..10,
            done_rounds in 0usize..10,
        ) {
            let steps = per_eval * evals;
            let step = epoch * steps + done_rounds.min(evals) * per_eval;
            let remaining = remaining_evals(step, epoch, steps, evals).unwrap();
            prop_assert_eq!(remaining + done_rounds.min(evals), evals);
        }

        #[test]
        fn prop_never_exceeds_evals_per_epoch(
            epoch in 0usize..20,
            per_eval in 1usize..20,
            evals in 1usize..8,
            extra_rounds in 0usize..30,
        ) {
            let steps = per_eval * evals;
            let step = epoch * steps + extra_rounds * per_eval;
            let remaining = remaining_evals(step, epoch, steps, evals).unwrap();
            prop_assert!(remaining <= evals);
            prop_assert_eq!(remaining, evals.saturating_sub(extra_rounds));
        }
    }
}
