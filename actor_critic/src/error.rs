//! Error types for actor-critic training.
//!
//! Errors are split by where they are raised:
//!
//! - [`ConfigError`]: invalid configuration, raised at construction.
//! - [`ShapeError`]: a batch violates its shape contract. Raised while building
//!   batches and never retried, since it means the task or the advantage
//!   estimator produced misaligned data.
//! - [`ScheduleError`]: a trainer's step counter does not line up with the
//!   evaluation schedule.
//! - [`ParamsError`]: a weight/state copy between models does not fit.
//!
//! [`ActorCriticError`] wraps all of them and is what public operations return.

use std::fmt;
use std::io;

use crate::checkpoint::CheckpointError;

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter must be positive.
    InvalidCount { field: &'static str, value: usize },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// More evaluations per epoch than training steps per epoch.
    InvalidEvalSplit {
        trainer: &'static str,
        steps_per_epoch: usize,
        evals_per_epoch: usize,
    },
    /// Train steps per epoch are not a multiple of evals per epoch.
    UnevenEvalSplit {
        trainer: &'static str,
        steps_per_epoch: usize,
        evals_per_epoch: usize,
    },
    /// On-policy algorithms can only train on the latest epoch.
    OnPolicyReplay { algorithm: &'static str, n_replay_epochs: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::InvalidEvalSplit {
                trainer,
                steps_per_epoch,
                evals_per_epoch,
            } => write!(
                f,
                "{} evals_per_epoch ({}) must be <= train_steps_per_epoch ({})",
                trainer, evals_per_epoch, steps_per_epoch
            ),
            ConfigError::UnevenEvalSplit {
                trainer,
                steps_per_epoch,
                evals_per_epoch,
            } => write!(
                f,
                "{} train_steps_per_epoch ({}) must be a multiple of evals_per_epoch ({})",
                trainer, steps_per_epoch, evals_per_epoch
            ),
            ConfigError::OnPolicyReplay {
                algorithm,
                n_replay_epochs,
            } => write!(
                f,
                "{} is on-policy and needs n_replay_epochs == 1, got {}",
                algorithm, n_replay_epochs
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// ShapeError
// ============================================================================

/// Shape-contract violation found while building a training batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Trajectory fields disagree on `[batch, time]`.
    Trajectory {
        field: &'static str,
        expected: [usize; 2],
        actual: [usize; 2],
    },
    /// Value model output must have a single trailing channel.
    ValueChannel { shape: [usize; 3] },
    /// Values must have `policy_batch_size` rows.
    PolicyBatchSize { expected: usize, actual: usize },
    /// Advantage estimator output does not fit the trajectory.
    Advantages { trajectory: [usize; 2], advantages: [usize; 2] },
    /// A truncated policy input does not match the advantages.
    PolicyInput {
        field: &'static str,
        expected: [usize; 2],
        actual: [usize; 2],
    },
    /// A host-side matrix was built from data of the wrong length.
    MatrixData { rows: usize, cols: usize, len: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Trajectory {
                field,
                expected,
                actual,
            } => write!(
                f,
                "trajectory field {} has [batch, time] {:?}, expected {:?}",
                field, actual, expected
            ),
            ShapeError::ValueChannel { shape } => write!(
                f,
                "values are expected to have shape [batch_size, length, 1], got {:?}",
                shape
            ),
            ShapeError::PolicyBatchSize { expected, actual } => write!(
                f,
                "values first dimension should = policy batch size, {} != {}",
                actual, expected
            ),
            ShapeError::Advantages {
                trajectory,
                advantages,
            } => write!(
                f,
                "advantages {:?} do not fit trajectory {:?}: same batch and no longer time axis required",
                advantages, trajectory
            ),
            ShapeError::PolicyInput {
                field,
                expected,
                actual,
            } => write!(
                f,
                "first 2 dimensions of {} should be the same as in advantages, {:?} != {:?}",
                field, actual, expected
            ),
            ShapeError::MatrixData { rows, cols, len } => write!(
                f,
                "matrix [{}, {}] cannot hold {} elements",
                rows, cols, len
            ),
        }
    }
}

impl std::error::Error for ShapeError {}

// ============================================================================
// ScheduleError
// ============================================================================

/// The evaluation schedule cannot be reconstructed from a trainer's step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The trainer is behind the start of the epoch.
    StepBehindEpoch { current_step: usize, epoch_start: usize },
    /// `steps_per_epoch / evals_per_epoch` is zero.
    ZeroStepsPerEval {
        steps_per_epoch: usize,
        evals_per_epoch: usize,
    },
    /// `steps_per_epoch` is not a multiple of `evals_per_epoch`.
    UnevenEvalSplit {
        steps_per_epoch: usize,
        evals_per_epoch: usize,
    },
    /// Steps done this epoch are not a whole number of evaluation rounds.
    MisalignedStep { done_steps: usize, steps_per_eval: usize },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::StepBehindEpoch {
                current_step,
                epoch_start,
            } => write!(
                f,
                "current step ({}) < previously done steps ({})",
                current_step, epoch_start
            ),
            ScheduleError::ZeroStepsPerEval {
                steps_per_epoch,
                evals_per_epoch,
            } => write!(
                f,
                "{} steps per epoch cannot be split into {} evaluations",
                steps_per_epoch, evals_per_epoch
            ),
            ScheduleError::UnevenEvalSplit {
                steps_per_epoch,
                evals_per_epoch,
            } => write!(
                f,
                "{} steps per epoch are not a multiple of {} evaluations",
                steps_per_epoch, evals_per_epoch
            ),
            ScheduleError::MisalignedStep {
                done_steps,
                steps_per_eval,
            } => write!(
                f,
                "done steps ({}) must be a multiple of train steps per eval ({})",
                done_steps, steps_per_eval
            ),
        }
    }
}

impl std::error::Error for ScheduleError {}

// ============================================================================
// ParamsError
// ============================================================================

/// A weight or state snapshot does not fit its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// The layer range exceeds one of the models.
    LayerRange {
        start: usize,
        end: usize,
        n_layers: usize,
    },
    /// Two layers at the same index hold differently shaped parameters.
    LayerMismatch { layer: usize, from: Vec<Vec<usize>>, to: Vec<Vec<usize>> },
    /// Per-layer parameter counts do not add up to the module's parameters.
    Layout { expected_params: usize, found_params: usize },
    /// A parameter tensor does not match the module parameter it replaces.
    ParamShape {
        index: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsError::LayerRange {
                start,
                end,
                n_layers,
            } => write!(
                f,
                "layer range {}..{} out of bounds for {} layers",
                start, end, n_layers
            ),
            ParamsError::LayerMismatch { layer, from, to } => write!(
                f,
                "layer {} shapes differ: {:?} vs {:?}",
                layer, from, to
            ),
            ParamsError::Layout {
                expected_params,
                found_params,
            } => write!(
                f,
                "layer layout covers {} parameters but the module has {}",
                expected_params, found_params
            ),
            ParamsError::ParamShape {
                index,
                expected,
                actual,
            } => write!(
                f,
                "parameter {} has shape {:?}, snapshot has {:?}",
                index, expected, actual
            ),
        }
    }
}

impl std::error::Error for ParamsError {}

// ============================================================================
// ActorCriticError
// ============================================================================

/// Umbrella error for actor-critic training.
#[derive(Debug)]
pub enum ActorCriticError {
    Config(ConfigError),
    Shape(ShapeError),
    Schedule(ScheduleError),
    Params(ParamsError),
    Checkpoint(CheckpointError),
    Io(io::Error),
    /// An input stream produced no batches right after being (re)started.
    EmptyStream { trainer: String },
    /// The trainer does not expose optimizer slots.
    OptimizerSlotsUnsupported { trainer: String },
    /// Tensor data could not be read back to the host.
    Tensor(String),
}

impl fmt::Display for ActorCriticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorCriticError::Config(e) => write!(f, "configuration error: {}", e),
            ActorCriticError::Shape(e) => write!(f, "shape error: {}", e),
            ActorCriticError::Schedule(e) => write!(f, "schedule error: {}", e),
            ActorCriticError::Params(e) => write!(f, "parameter copy error: {}", e),
            ActorCriticError::Checkpoint(e) => write!(f, "checkpoint error: {}", e),
            ActorCriticError::Io(e) => write!(f, "IO error: {}", e),
            ActorCriticError::EmptyStream { trainer } => {
                write!(f, "input stream of {} trainer is empty", trainer)
            }
            ActorCriticError::OptimizerSlotsUnsupported { trainer } => {
                write!(f, "{} trainer does not expose optimizer slots", trainer)
            }
            ActorCriticError::Tensor(e) => write!(f, "tensor data error: {}", e),
        }
    }
}

impl std::error::Error for ActorCriticError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActorCriticError::Config(e) => Some(e),
            ActorCriticError::Shape(e) => Some(e),
            ActorCriticError::Schedule(e) => Some(e),
            ActorCriticError::Params(e) => Some(e),
            ActorCriticError::Checkpoint(e) => Some(e),
            ActorCriticError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ActorCriticError {
    fn from(e: ConfigError) -> Self {
        ActorCriticError::Config(e)
    }
}

impl From<ShapeError> for ActorCriticError {
    fn from(e: ShapeError) -> Self {
        ActorCriticError::Shape(e)
    }
}

impl From<ScheduleError> for ActorCriticError {
    fn from(e: ScheduleError) -> Self {
        ActorCriticError::Schedule(e)
    }
}

impl From<ParamsError> for ActorCriticError {
    fn from(e: ParamsError) -> Self {
        ActorCriticError::Params(e)
    }
}

impl From<CheckpointError> for ActorCriticError {
    fn from(e: CheckpointError) -> Self {
        ActorCriticError::Checkpoint(e)
    }
}

impl From<io::Error> for ActorCriticError {
    fn from(e: io::Error) -> Self {
        ActorCriticError::Io(e)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ActorCriticError>;
