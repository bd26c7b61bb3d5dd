//! A [`SupervisedTrainer`] over a burn module and optimizer.
//!
//! # Training step
//!
//! ```text
//! batch ──► loss_fn(model, batch) ──► backward ──► GradientsParams ──► optimizer.step(lr(step))
//! ```
//!
//! After the training steps of a round, `eval_steps` batches from a separate
//! stream are scored without updating the model. Averaged metrics are logged
//! and kept in [`BurnTrainer::history`]; with an output directory a checkpoint
//! is written as well.

use std::collections::BTreeMap;
use std::path::Path;

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use crate::algorithms::algorithm::PolicyAlgorithm;
use crate::algorithms::inputs::PolicyBatch;
use crate::algorithms::losses::value_loss;
use crate::algorithms::pipeline::PolicyLossPipeline;
use crate::batches::value::ValueBatch;
use crate::checkpoint::{Checkpointer, CheckpointerConfig};
use crate::core::module_params::{load_module_weights, module_weights};
use crate::core::params::ModelParams;
use crate::error::{ActorCriticError, Result};
use crate::metrics::{CSVLogger, EvalSnapshot, LogLogger, MetricAccumulator, MetricsLogger, MultiLogger};
use crate::model::{LayeredModel, PolicyNetwork, ValueNetwork};
use crate::scheduling::LRScheduler;
use crate::trainer::supervised::{BatchStream, InputStreamProvider, SupervisedTrainer, TrainerSetup};

/// Scalar loss for backpropagation plus named metrics.
#[derive(Debug, Clone)]
pub struct LossOutput<B: Backend> {
    /// Single-element loss tensor.
    pub loss: Tensor<B, 1>,
    /// Extra metrics reported during evaluation.
    pub metrics: BTreeMap<String, f32>,
}

/// Loss of a model on one batch.
pub type LossFn<B, M, I> = Box<dyn Fn(&M, I) -> Result<LossOutput<B>>>;

/// Masked L2 loss of a value network on value batches.
pub fn value_loss_fn<B, M>() -> LossFn<B, M, ValueBatch<B>>
where
    B: Backend,
    M: ValueNetwork<B>,
{
    Box::new(|model: &M, batch: ValueBatch<B>| {
        let predictions = model.forward(batch.observations);
        Ok(LossOutput {
            loss: value_loss(predictions, batch.targets, batch.mask),
            metrics: BTreeMap::new(),
        })
    })
}

/// Policy loss of `pipeline` on policy batches.
pub fn policy_loss_fn<B, P, A>(pipeline: PolicyLossPipeline<A>) -> LossFn<B, P, PolicyBatch<B>>
where
    B: Backend,
    P: PolicyNetwork<B>,
    A: PolicyAlgorithm<B> + 'static,
{
    Box::new(move |model: &P, batch: PolicyBatch<B>| pipeline.loss(model, batch))
}

fn scalar<B: Backend>(tensor: &Tensor<B, 1>) -> f32 {
    tensor.clone().into_scalar().elem::<f32>()
}

/// Pull the next batch, restarting the stream when it ends.
fn next_batch<I>(
    inputs: &mut InputStreamProvider<I>,
    stream: &mut Option<BatchStream<I>>,
    trainer: &str,
) -> Result<I> {
    if let Some(batch) = stream.as_mut().and_then(|s| s.next()) {
        return batch;
    }
    let mut fresh = inputs();
    match fresh.next() {
        Some(batch) => {
            *stream = Some(fresh);
            batch
        }
        None => Err(ActorCriticError::EmptyStream {
            trainer: trainer.to_string(),
        }),
    }
}

// ============================================================================
// BurnTrainer
// ============================================================================

/// Trains a burn module with a burn optimizer on a restartable input stream.
pub struct BurnTrainer<B: AutodiffBackend, M, O, I> {
    name: String,
    model: M,
    optimizer: O,
    schedule: Box<dyn LRScheduler>,
    loss_fn: LossFn<B, M, I>,
    inputs: InputStreamProvider<I>,
    train_stream: Option<BatchStream<I>>,
    eval_stream: Option<BatchStream<I>>,
    step: usize,
    checkpointer: Option<Checkpointer>,
    logger: Box<dyn MetricsLogger>,
    history: Vec<EvalSnapshot>,
}

impl<B, M, O, I> BurnTrainer<B, M, O, I>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + LayeredModel<B>,
    O: Optimizer<M, B>,
{
    /// Create a trainer.
    ///
    /// With an output directory in `setup`, checkpoints are written there and
    /// metrics go to `metrics.csv` in addition to the `log` facade.
    pub fn new(
        name: impl Into<String>,
        model: M,
        optimizer: O,
        schedule: impl LRScheduler + 'static,
        loss_fn: LossFn<B, M, I>,
        setup: TrainerSetup<I>,
    ) -> Result<Self> {
        let name = name.into();
        let (checkpointer, logger): (Option<Checkpointer>, Box<dyn MetricsLogger>) =
            match &setup.output_dir {
                Some(dir) => {
                    let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir))?;
                    let csv = CSVLogger::new(dir.join("metrics.csv"))?;
                    (
                        Some(checkpointer),
                        Box::new(MultiLogger::new().add(LogLogger).add(csv)),
                    )
                }
                None => (None, Box::new(LogLogger)),
            };

        Ok(Self {
            name,
            model,
            optimizer,
            schedule: Box::new(schedule),
            loss_fn,
            inputs: setup.inputs,
            train_stream: None,
            eval_stream: None,
            step: 0,
            checkpointer,
            logger,
            history: Vec::new(),
        })
    }

    /// Replace the metrics logger.
    pub fn with_logger(mut self, logger: impl MetricsLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Evaluation snapshots, oldest first.
    pub fn history(&self) -> &[EvalSnapshot] {
        &self.history
    }

    pub fn checkpoint_dir(&self) -> Option<&Path> {
        self.checkpointer.as_ref().map(Checkpointer::dir)
    }

    /// Load the latest checkpoint of the output directory, if there is one.
    ///
    /// Returns the restored step. The optimizer state starts fresh.
    pub fn restore_latest(&mut self, device: &B::Device) -> Result<Option<usize>> {
        let Some(checkpointer) = &self.checkpointer else {
            return Ok(None);
        };
        if checkpointer.list()?.is_empty() {
            return Ok(None);
        }
        let (model, step) = checkpointer.restore_latest::<B, M>(self.model.clone(), device)?;
        self.model = model;
        self.step = step;
        log::info!("[{}] restored checkpoint at step {}", self.name, step);
        Ok(Some(step))
    }

    fn evaluate(&mut self, eval_steps: usize) -> Result<BTreeMap<String, f32>> {
        let mut metrics = MetricAccumulator::new();
        for _ in 0..eval_steps {
            let batch = next_batch(&mut self.inputs, &mut self.eval_stream, &self.name)?;
            let output = (self.loss_fn)(&self.model, batch)?;
            metrics.record("loss", scalar(&output.loss));
            metrics.record_all(&output.metrics);
        }
        Ok(metrics.means())
    }
}

impl<B, M, O, I> SupervisedTrainer<B> for BurnTrainer<B, M, O, I>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + LayeredModel<B>,
    O: Optimizer<M, B>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&self) -> usize {
        self.step
    }

    fn model_weights(&self) -> Result<ModelParams<B>> {
        Ok(module_weights(&self.model)?)
    }

    fn set_model_weights(&mut self, weights: ModelParams<B>) -> Result<()> {
        self.model = load_module_weights(self.model.clone(), &weights)?;
        Ok(())
    }

    fn model_state(&self) -> ModelParams<B> {
        self.model.layer_state()
    }

    fn set_model_state(&mut self, state: ModelParams<B>) -> Result<()> {
        self.model = self.model.clone().with_layer_state(state)?;
        Ok(())
    }

    fn train_epoch(&mut self, steps: usize, eval_steps: usize) -> Result<()> {
        let mut train_metrics = MetricAccumulator::new();
        let mut lr = self.schedule.get_lr(self.step);

        for _ in 0..steps {
            let batch = next_batch(&mut self.inputs, &mut self.train_stream, &self.name)?;
            lr = self.schedule.get_lr(self.step);

            let output = (self.loss_fn)(&self.model, batch)?;
            train_metrics.record("loss", scalar(&output.loss));

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self.optimizer.step(lr, self.model.clone(), grads);
            self.step += 1;
        }

        let metrics = self.evaluate(eval_steps)?;
        let snapshot = EvalSnapshot::new(self.name.clone(), self.step)
            .with_learning_rate(lr)
            .with_train_loss(train_metrics.mean("loss").unwrap_or(0.0))
            .with_metrics(metrics);
        self.logger.log(&snapshot);
        self.history.push(snapshot);

        if let Some(checkpointer) = &mut self.checkpointer {
            checkpointer.save::<B, M>(&self.model, self.step)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.logger.flush();
        self.train_stream = None;
        self.eval_stream = None;
        Ok(())
    }
}
