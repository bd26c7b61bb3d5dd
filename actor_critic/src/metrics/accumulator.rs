//! Running means of named metrics over an evaluation round.

use std::collections::BTreeMap;

/// Accumulates named metric values and reports their means.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    sums: BTreeMap<String, f64>,
    counts: BTreeMap<String, usize>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one value of `name`. Non-finite values are skipped.
    pub fn record(&mut self, name: &str, value: f32) {
        if !value.is_finite() {
            log::warn!("Skipping non-finite value {} for metric {}", value, name);
            return;
        }
        *self.sums.entry(name.to_string()).or_insert(0.0) += value as f64;
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Record every entry of a metrics map.
    pub fn record_all(&mut self, metrics: &BTreeMap<String, f32>) {
        for (name, value) in metrics {
            self.record(name, *value);
        }
    }

    /// Mean of `name`, if any value was recorded.
    pub fn mean(&self, name: &str) -> Option<f32> {
        let count = *self.counts.get(name)?;
        let sum = self.sums.get(name)?;
        Some((sum / count as f64) as f32)
    }

    /// Means of all metrics.
    pub fn means(&self) -> BTreeMap<String, f32> {
        self.sums
            .iter()
            .map(|(name, sum)| {
                let count = self.counts.get(name).copied().unwrap_or(1).max(1);
                (name.clone(), (sum / count as f64) as f32)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    pub fn reset(&mut self) {
        self.sums.clear();
        self.counts.clear();
    }
}
