//! Learning rate schedules for supervised trainers.
//!
//! - `ConstantLR`: fixed learning rate
//! - `LinearDecay`: linear interpolation from start to end LR
//! - `Multifactor`: product of named factors, by default
//!   `constant * linear_warmup * rsqrt_decay`
//!
//! # Data Integrity
//!
//! Invalid inputs (NaN/Inf or negative rates, zero step counts) panic in debug
//! builds and are sanitized in release builds. Outputs are always finite.

/// Learning rate scheduler trait.
///
/// The step is the trainer's global step, so a resumed trainer continues the
/// schedule where it stopped.
pub trait LRScheduler: Send + Sync {
    /// Get the learning rate for a given step.
    fn get_lr(&self, step: usize) -> f64;
}

/// Debug builds reject bad rates; release builds map them to 0.
fn checked_rate(schedule: &str, name: &str, lr: f64) -> f64 {
    debug_assert!(
        lr.is_finite(),
        "{}: {} must be finite, got {}",
        schedule,
        name,
        lr
    );
    debug_assert!(
        lr >= 0.0,
        "{}: {} must be non-negative, got {}",
        schedule,
        name,
        lr
    );
    sanitize_lr(lr)
}

fn sanitize_lr(lr: f64) -> f64 {
    if lr.is_finite() && lr >= 0.0 {
        lr
    } else {
        0.0
    }
}

// ============================================================================
// ConstantLR
// ============================================================================

/// The same rate at every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantLR(f64);

impl ConstantLR {
    pub fn new(lr: f64) -> Self {
        Self(checked_rate("ConstantLR", "lr", lr))
    }
}

impl LRScheduler for ConstantLR {
    fn get_lr(&self, _step: usize) -> f64 {
        self.0
    }
}

// ============================================================================
// LinearDecay
// ============================================================================

/// Moves linearly from `start` to `end` over `steps`, then holds `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDecay {
    start: f64,
    end: f64,
    steps: usize,
}

impl LinearDecay {
    /// A zero `steps` panics in debug builds and holds `start` in release.
    pub fn new(start: f64, end: f64, steps: usize) -> Self {
        debug_assert!(steps > 0, "LinearDecay: total_steps must be > 0, got {}", steps);
        Self {
            start: checked_rate("LinearDecay", "start", start),
            end: checked_rate("LinearDecay", "end", end),
            steps,
        }
    }
}

impl LRScheduler for LinearDecay {
    fn get_lr(&self, step: usize) -> f64 {
        if self.steps == 0 {
            return self.start;
        }
        let progress = (step as f64 / self.steps as f64).min(1.0);
        self.start + (self.end - self.start) * progress
    }
}

// ============================================================================
// Multifactor
// ============================================================================

/// One factor of a [`Multifactor`] schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LRFactor {
    /// Multiply by the constant.
    Constant,
    /// Multiply by `min(1, step / warmup_steps)`.
    LinearWarmup,
    /// Divide by `sqrt(max(step, warmup_steps))`.
    RsqrtDecay,
}

/// Product of factors, the default schedule of the value trainer.
///
/// With the default factors:
///
/// ```text
/// lr(step) = constant * min(1, step / warmup) / sqrt(max(step, warmup))
/// ```
#[derive(Debug, Clone)]
pub struct Multifactor {
    constant: f64,
    warmup_steps: usize,
    factors: Vec<LRFactor>,
}

impl Default for Multifactor {
    fn default() -> Self {
        Self {
            constant: 0.1,
            warmup_steps: 400,
            factors: vec![LRFactor::Constant, LRFactor::LinearWarmup, LRFactor::RsqrtDecay],
        }
    }
}

impl Multifactor {
    /// # Panics (debug only)
    ///
    /// Panics if `constant` is NaN, Inf, or negative, or `warmup_steps` is 0.
    pub fn new(constant: f64, warmup_steps: usize) -> Self {
        debug_assert!(
            warmup_steps > 0,
            "Multifactor: warmup_steps must be > 0, got {}",
            warmup_steps
        );
        Self {
            constant: checked_rate("Multifactor", "constant", constant),
            warmup_steps: warmup_steps.max(1),
            ..Self::default()
        }
    }

    /// Replace the factor list.
    pub fn with_factors(mut self, factors: Vec<LRFactor>) -> Self {
        self.factors = factors;
        self
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    pub fn factors(&self) -> &[LRFactor] {
        &self.factors
    }
}

impl LRScheduler for Multifactor {
    fn get_lr(&self, step: usize) -> f64 {
        let step = step as f64;
        let warmup = self.warmup_steps as f64;
        let lr = self.factors.iter().fold(1.0, |lr, factor| match factor {
            LRFactor::Constant => lr * self.constant,
            LRFactor::LinearWarmup => lr * (step / warmup).min(1.0),
            LRFactor::RsqrtDecay => lr / step.max(warmup).sqrt(),
        });
        sanitize_lr(lr)
    }
}
