//! Dual value/policy trainer.
//!
//! # Epoch
//!
//! ```text
//! policy.state <- collected state
//! [shared]  policy --copy 0..n--> value
//! value target <- value
//! value.train_epoch  x remaining value rounds
//! [shared]  value --copy 0..n--> policy     (skipped when resuming mid-policy)
//! value target <- value
//! policy.train_epoch x remaining policy rounds
//! ```
//!
//! The remaining rounds come from each trainer's step counter, so an epoch
//! that was interrupted picks up where it stopped. When the value rounds are
//! all done but the policy already started its rounds, the value→policy copy
//! is skipped: the policy trained on top of that copy before the restart and
//! copying again would overwrite its progress on the shared layers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::tensor::backend::Backend;

use crate::algorithms::algorithm::PolicyAlgorithm;
use crate::algorithms::inputs::PolicyBatch;
use crate::batches::{PolicyBatchBuilder, ReplayWindow, ValueBatch, ValueBatchBuilder};
use crate::config::ActorCriticConfig;
use crate::coordinator::schedule::remaining_evals;
use crate::coordinator::weight_sharing::copy_model_weights_and_state;
use crate::core::params::ModelParams;
use crate::core::value_target::ValueTarget;
use crate::error::Result;
use crate::model::{ModelMode, ValueModelSignature, ValueNetwork};
use crate::task::Task;
use crate::trainer::supervised::{BatchStream, SupervisedTrainer, TrainerSetup};

/// What one call to [`ActorCriticTrainer::train_epoch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSummary {
    pub epoch_index: usize,
    /// Value evaluation rounds run.
    pub value_evals: usize,
    /// Policy evaluation rounds run.
    pub policy_evals: usize,
    /// Whether shared layers were copied from value to policy.
    pub copied_value_to_policy: bool,
    /// Value-target version the policy trained against.
    pub value_target_version: u64,
}

/// Trains a value model and a policy model in alternation.
///
/// `V` and `P` are the value and policy trainers, `M` the value-target model,
/// `A` the algorithm and `T` the task.
pub struct ActorCriticTrainer<B: Backend, T, M, A, V, P> {
    config: ActorCriticConfig,
    task: Arc<T>,
    algorithm: Arc<A>,
    value_target: ValueTarget<B, M>,
    value_batches: ValueBatchBuilder<B, T, M>,
    policy_batches: PolicyBatchBuilder<B, T, M, A>,
    value_trainer: V,
    policy_trainer: P,
    value_output_dir: Option<PathBuf>,
}

impl<B, T, M, A, V, P> ActorCriticTrainer<B, T, M, A, V, P>
where
    B: Backend,
    T: Task<B> + 'static,
    M: ValueNetwork<B> + 'static,
    A: PolicyAlgorithm<B> + 'static,
    V: SupervisedTrainer<B>,
    P: SupervisedTrainer<B>,
{
    /// Build the value target and both trainers.
    ///
    /// `value_model` is called once, in eval mode, for the value-target model.
    /// The trainer factories receive restartable batch streams; the value
    /// trainer's output directory is `<output_dir>/value`, created here, and
    /// the policy trainer gets `<output_dir>` itself.
    pub fn new<MF, VF, PF>(
        config: ActorCriticConfig,
        task: Arc<T>,
        algorithm: A,
        value_model: MF,
        value_trainer: VF,
        policy_trainer: PF,
    ) -> Result<Self>
    where
        MF: FnOnce(ModelMode, &ValueModelSignature) -> M,
        VF: FnOnce(TrainerSetup<ValueBatch<B>>) -> Result<V>,
        PF: FnOnce(TrainerSetup<PolicyBatch<B>>) -> Result<P>,
    {
        config.validate()?;
        let algorithm = Arc::new(algorithm);
        let replay = ReplayWindow::new(
            config.n_replay_epochs,
            algorithm.policy_kind(),
            algorithm.name(),
        )?;

        let signature = ValueModelSignature::from_observation_shape(&task.observation_shape());
        let value_target = ValueTarget::new(value_model(ModelMode::Eval, &signature));

        let value_batches = ValueBatchBuilder::new(
            &config,
            Arc::clone(&task),
            value_target.clone(),
            algorithm.advantage_estimator(),
            replay,
        )?;
        let policy_batches = PolicyBatchBuilder::new(
            &config,
            Arc::clone(&task),
            value_target.clone(),
            Arc::clone(&algorithm),
            replay,
        )?;

        let value_output_dir = match &config.output_dir {
            Some(dir) => {
                let dir = dir.join("value");
                fs::create_dir_all(&dir)?;
                Some(dir)
            }
            None => None,
        };

        let inputs = value_batches.clone();
        let value_trainer = value_trainer(TrainerSetup::new(
            Box::new(move || inputs.stream()),
            value_output_dir.clone(),
        ))?;
        let inputs = policy_batches.clone();
        let policy_trainer = policy_trainer(TrainerSetup::new(
            Box::new(move || inputs.stream()),
            config.output_dir.clone(),
        ))?;

        log::info!(
            "{} actor-critic: {} shared layers, replay epochs {:?}",
            algorithm.name(),
            config.n_shared_layers,
            replay.epochs()
        );

        Ok(Self {
            config,
            task,
            algorithm,
            value_target,
            value_batches,
            policy_batches,
            value_trainer,
            policy_trainer,
            value_output_dir,
        })
    }

    /// Run the value and policy rounds left in epoch `epoch_index` (0-based).
    ///
    /// `collected_state` is the state of the policy model that collected the
    /// epoch's trajectories.
    pub fn train_epoch(
        &mut self,
        epoch_index: usize,
        collected_state: ModelParams<B>,
    ) -> Result<EpochSummary> {
        let n_shared = self.config.n_shared_layers;
        let copy_slots = self.config.copy_optimizer_slots;

        self.policy_trainer.set_model_state(collected_state)?;

        if n_shared > 0 {
            copy_model_weights_and_state(
                0..n_shared,
                &self.policy_trainer,
                &mut self.value_trainer,
                copy_slots,
            )?;
        }
        self.refresh_value_target()?;

        let value_evals = remaining_evals(
            self.value_trainer.step(),
            epoch_index,
            self.config.value_train_steps_per_epoch,
            self.config.value_evals_per_epoch,
        )?;
        log::info!(
            "epoch {}: value trainer at step {}, {} rounds to run",
            epoch_index,
            self.value_trainer.step(),
            value_evals
        );
        for _ in 0..value_evals {
            self.value_trainer.train_epoch(
                self.config.value_steps_per_eval(),
                self.config.value_eval_steps,
            )?;
        }

        let policy_evals = remaining_evals(
            self.policy_trainer.step(),
            epoch_index,
            self.config.policy_train_steps_per_epoch,
            self.config.policy_evals_per_epoch,
        )?;
        let stopped_after_value =
            value_evals == 0 && policy_evals < self.config.policy_evals_per_epoch;
        let copied_value_to_policy = n_shared > 0 && !stopped_after_value;
        if copied_value_to_policy {
            copy_model_weights_and_state(
                0..n_shared,
                &self.value_trainer,
                &mut self.policy_trainer,
                copy_slots,
            )?;
        } else if n_shared > 0 {
            log::info!(
                "epoch {}: resuming mid-policy, keeping the policy's shared layers",
                epoch_index
            );
        }

        let value_target_version = self.refresh_value_target()?;

        log::info!(
            "epoch {}: policy trainer at step {}, {} rounds to run",
            epoch_index,
            self.policy_trainer.step(),
            policy_evals
        );
        for _ in 0..policy_evals {
            self.policy_trainer.train_epoch(
                self.config.policy_steps_per_eval(),
                self.config.policy_eval_steps,
            )?;
        }

        Ok(EpochSummary {
            epoch_index,
            value_evals,
            policy_evals,
            copied_value_to_policy,
            value_target_version,
        })
    }

    fn refresh_value_target(&self) -> Result<u64> {
        let weights = self.value_trainer.model_weights()?;
        let state = self.value_trainer.model_state();
        let version = self.value_target.refresh(&weights, &state)?;
        log::debug!("value target refreshed to version {}", version);
        Ok(version)
    }

    /// Fresh stream of value batches.
    pub fn value_batches_stream(&self) -> BatchStream<ValueBatch<B>> {
        self.value_batches.stream()
    }

    /// Fresh stream of policy batches.
    pub fn policy_batches_stream(&self) -> BatchStream<PolicyBatch<B>> {
        self.policy_batches.stream()
    }

    pub fn config(&self) -> &ActorCriticConfig {
        &self.config
    }

    pub fn task(&self) -> &Arc<T> {
        &self.task
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn value_target(&self) -> &ValueTarget<B, M> {
        &self.value_target
    }

    pub fn value_trainer(&self) -> &V {
        &self.value_trainer
    }

    pub fn value_trainer_mut(&mut self) -> &mut V {
        &mut self.value_trainer
    }

    pub fn policy_trainer(&self) -> &P {
        &self.policy_trainer
    }

    pub fn policy_trainer_mut(&mut self) -> &mut P {
        &mut self.policy_trainer
    }

    /// `<output_dir>/value`, when an output directory is configured.
    pub fn value_output_dir(&self) -> Option<&Path> {
        self.value_output_dir.as_deref()
    }

    /// Close the value trainer, then the policy trainer.
    pub fn close(&mut self) -> Result<()> {
        self.value_trainer.close()?;
        self.policy_trainer.close()
    }
}
