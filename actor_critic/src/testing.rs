//! Test fixtures: tiny models, a constant task and a recording trainer.

use std::sync::Arc;

use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;
use parking_lot::Mutex;

use crate::core::module_params::module_weights;
use crate::core::params::ModelParams;
use crate::core::trajectory::{SliceRequest, TrajectoryBatch};
use crate::error::Result;
use crate::model::{LayeredModel, PolicyNetwork, ValueNetwork};
use crate::task::{Task, TrajectoryStream};
use crate::trainer::supervised::{BatchStream, InputStreamProvider, SupervisedTrainer, TrainerSetup};

pub type B = NdArray<f32>;
pub type AB = Autodiff<NdArray<f32>>;

// ============================================================================
// Models
// ============================================================================

/// obs -> hidden -> 1. Layers: `hidden`, `out`.
#[derive(Module, Debug)]
pub struct TinyValueNet<B: Backend> {
    pub hidden: Linear<B>,
    pub out: Linear<B>,
}

impl<B: Backend> TinyValueNet<B> {
    pub fn new(obs_features: usize, hidden: usize, device: &B::Device) -> Self {
        Self {
            hidden: LinearConfig::new(obs_features, hidden).init(device),
            out: LinearConfig::new(hidden, 1).init(device),
        }
    }
}

impl<B: Backend> LayeredModel<B> for TinyValueNet<B> {
    fn layer_param_counts(&self) -> Vec<usize> {
        vec![2, 2]
    }
}

impl<B: Backend> ValueNetwork<B> for TinyValueNet<B> {
    fn forward(&self, observations: Tensor<B, 3>) -> Tensor<B, 3> {
        self.out.forward(relu(self.hidden.forward(observations)))
    }
}

/// Unit-variance Gaussian policy. The trunk has the same shape as
/// [`TinyValueNet::hidden`] so the first layer can be shared.
#[derive(Module, Debug)]
pub struct GaussianPolicy<B: Backend> {
    pub trunk: Linear<B>,
    pub head: Linear<B>,
}

impl<B: Backend> GaussianPolicy<B> {
    pub fn new(obs_features: usize, hidden: usize, act_features: usize, device: &B::Device) -> Self {
        Self {
            trunk: LinearConfig::new(obs_features, hidden).init(device),
            head: LinearConfig::new(hidden, act_features).init(device),
        }
    }
}

impl<B: Backend> LayeredModel<B> for GaussianPolicy<B> {
    fn layer_param_counts(&self) -> Vec<usize> {
        vec![2, 2]
    }
}

impl<B: Backend> PolicyNetwork<B> for GaussianPolicy<B> {
    fn log_probs(&self, observations: Tensor<B, 3>, actions: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, time, _] = actions.dims();
        let mean = self.head.forward(relu(self.trunk.forward(observations)));
        // -0.5 * ln(2 * pi)
        (actions - mean)
            .powf_scalar(2.0)
            .mul_scalar(-0.5)
            .sub_scalar(0.918_938_5)
            .sum_dim(2)
            .reshape([batch, time])
    }
}

// ============================================================================
// Task
// ============================================================================

/// Trajectory of all-ones observations, zero actions and a constant reward.
pub fn constant_trajectory<B: Backend>(
    batch: usize,
    length: usize,
    obs_features: usize,
    act_features: usize,
    reward: f32,
    gamma: f32,
    device: &B::Device,
) -> TrajectoryBatch<B> {
    let mut returns = vec![0.0; length];
    let mut acc = 0.0;
    for t in (0..length).rev() {
        acc = reward + gamma * acc;
        returns[t] = acc;
    }
    let returns: Vec<f32> = returns.iter().cycle().take(batch * length).copied().collect();

    TrajectoryBatch {
        observations: Tensor::ones([batch, length, obs_features], device),
        actions: Tensor::zeros([batch, length, act_features], device),
        rewards: Tensor::full([batch, length], reward, device),
        returns: Tensor::from_data(TensorData::new(returns, [batch, length]), device),
        log_probs: Tensor::zeros([batch, length], device),
        mask: Tensor::ones([batch, length], device),
    }
}

/// Task that always serves the same constant trajectory and records requests.
pub struct FixedTask {
    pub gamma: f32,
    pub obs_features: usize,
    pub act_features: usize,
    pub reward: f32,
    /// Serve this batch size regardless of the request.
    pub batch_size_override: Option<usize>,
    requests: Mutex<Vec<SliceRequest>>,
}

impl FixedTask {
    pub fn new(gamma: f32, obs_features: usize, act_features: usize) -> Self {
        Self {
            gamma,
            obs_features,
            act_features,
            reward: 1.0,
            batch_size_override: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reward(mut self, reward: f32) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_batch_size_override(mut self, batch_size: usize) -> Self {
        self.batch_size_override = Some(batch_size);
        self
    }

    pub fn requests(&self) -> Vec<SliceRequest> {
        self.requests.lock().clone()
    }
}

impl<B: Backend> Task<B> for FixedTask {
    fn gamma(&self) -> f32 {
        self.gamma
    }

    fn observation_shape(&self) -> Vec<usize> {
        vec![self.obs_features]
    }

    fn trajectory_batch_stream(&self, request: SliceRequest) -> TrajectoryStream<B> {
        let batch = self.batch_size_override.unwrap_or(request.batch_size);
        let trajectory = constant_trajectory::<B>(
            batch,
            request.max_slice_length,
            self.obs_features,
            self.act_features,
            self.reward,
            self.gamma,
            &Default::default(),
        );
        self.requests.lock().push(request);
        Box::new(std::iter::repeat(trajectory))
    }
}

// ============================================================================
// Recording trainer
// ============================================================================

/// Calls made on recording trainers, in order, shared between trainers.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// A [`SupervisedTrainer`] that stores snapshots instead of training.
///
/// `train_epoch` pulls `steps` batches from its input stream so batch
/// construction errors surface like they would in a real trainer.
pub struct RecordingTrainer<B: Backend, I> {
    name: String,
    step: usize,
    weights: ModelParams<B>,
    state: ModelParams<B>,
    slots: Option<ModelParams<B>>,
    inputs: InputStreamProvider<I>,
    stream: Option<BatchStream<I>>,
    events: EventLog,
}

impl<B: Backend, I> RecordingTrainer<B, I> {
    pub fn new(
        name: &str,
        model: &impl LayeredModel<B>,
        setup: TrainerSetup<I>,
        events: EventLog,
    ) -> Self {
        let weights = module_weights(model).expect("fixture model layout");
        let n_layers = weights.n_layers();
        Self {
            name: name.to_string(),
            step: 0,
            weights,
            state: ModelParams::empty(n_layers),
            slots: None,
            inputs: setup.inputs,
            stream: None,
            events,
        }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn with_slots(mut self, slots: ModelParams<B>) -> Self {
        self.slots = Some(slots);
        self
    }

    fn record(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl<B: Backend, I> SupervisedTrainer<B> for RecordingTrainer<B, I> {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&self) -> usize {
        self.step
    }

    fn model_weights(&self) -> Result<ModelParams<B>> {
        Ok(self.weights.clone())
    }

    fn set_model_weights(&mut self, weights: ModelParams<B>) -> Result<()> {
        self.record(format!("{}.set_weights", self.name));
        self.weights = weights;
        Ok(())
    }

    fn model_state(&self) -> ModelParams<B> {
        self.state.clone()
    }

    fn set_model_state(&mut self, state: ModelParams<B>) -> Result<()> {
        self.record(format!("{}.set_state", self.name));
        self.state = state;
        Ok(())
    }

    fn optimizer_slots(&self) -> Option<ModelParams<B>> {
        self.slots.clone()
    }

    fn set_optimizer_slots(&mut self, slots: ModelParams<B>) -> Result<()> {
        self.record(format!("{}.set_slots", self.name));
        self.slots = Some(slots);
        Ok(())
    }

    fn train_epoch(&mut self, steps: usize, eval_steps: usize) -> Result<()> {
        self.record(format!("{}.train_epoch({}, {})", self.name, steps, eval_steps));
        for _ in 0..steps {
            if self.stream.is_none() {
                self.stream = Some((self.inputs)());
            }
            if let Some(batch) = self.stream.as_mut().and_then(|s| s.next()) {
                batch?;
            }
        }
        self.step += steps;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.record(format!("{}.close", self.name));
        Ok(())
    }
}
