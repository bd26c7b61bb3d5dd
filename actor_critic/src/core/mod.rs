//! Core data types shared by batch builders and trainers.

pub mod matrix;
pub mod module_params;
pub mod params;
pub mod trajectory;
pub mod value_target;

pub use matrix::StepMatrix;
pub use module_params::{load_module_weights, module_weights};
pub use params::{LayerParams, ModelParams, ParamTensor};
pub use trajectory::{time_prefix2, time_prefix3, SliceRequest, TrajectoryBatch};
pub use value_target::ValueTarget;
