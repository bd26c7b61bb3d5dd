//! Evaluation metrics and logging.
//!
//! - [`MetricAccumulator`]: running means of named metrics
//! - [`LogLogger`]: `log` facade output
//! - [`CSVLogger`]: CSV file logging for analysis
//! - [`MultiLogger`]: combine multiple loggers

pub mod accumulator;
pub mod logger;

pub use accumulator::MetricAccumulator;
pub use logger::{CSVLogger, EvalSnapshot, LogLogger, MetricsLogger, MultiLogger};
