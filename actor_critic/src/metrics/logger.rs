//! Evaluation loggers for supervised trainers.
//!
//! Provides different logging backends for evaluation metrics.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Metrics of one evaluation round of a trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSnapshot {
    /// Trainer name (e.g. "value", "policy").
    pub trainer: String,
    /// Trainer step at evaluation time.
    pub step: usize,
    /// Learning rate of the last training step.
    pub learning_rate: f64,
    /// Mean training loss since the previous evaluation.
    pub train_loss: f32,
    /// Averaged eval metrics, including `loss`.
    pub metrics: BTreeMap<String, f32>,
}

impl EvalSnapshot {
    pub fn new(trainer: impl Into<String>, step: usize) -> Self {
        Self {
            trainer: trainer.into(),
            step,
            learning_rate: 0.0,
            train_loss: 0.0,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_train_loss(mut self, loss: f32) -> Self {
        self.train_loss = loss;
        self
    }

    pub fn with_metrics(mut self, metrics: BTreeMap<String, f32>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Logger trait for different logging backends.
pub trait MetricsLogger {
    /// Log an evaluation snapshot.
    fn log(&mut self, snapshot: &EvalSnapshot);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Logs snapshots through the `log` facade at info level.
#[derive(Debug, Default)]
pub struct LogLogger;

impl MetricsLogger for LogLogger {
    fn log(&mut self, snapshot: &EvalSnapshot) {
        let metrics = snapshot
            .metrics
            .iter()
            .map(|(name, value)| format!("{}={:.6}", name, value))
            .collect::<Vec<_>>()
            .join(" ");
        log::info!(
            "[{}] step {} | lr {:.3e} | train_loss {:.6} | {}",
            snapshot.trainer,
            snapshot.step,
            snapshot.learning_rate,
            snapshot.train_loss,
            metrics
        );
    }

    fn flush(&mut self) {}
}

/// CSV file logger for analysis.
///
/// Metric columns are fixed by the first snapshot; metrics missing from later
/// snapshots are written as empty cells.
pub struct CSVLogger {
    writer: BufWriter<File>,
    columns: Option<Vec<String>>,
    start_time: Instant,
}

impl CSVLogger {
    /// Create a new CSV logger writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            columns: None,
            start_time: Instant::now(),
        })
    }

    fn write_header(&mut self, columns: &[String]) -> std::io::Result<()> {
        write!(self.writer, "trainer,step,learning_rate,train_loss")?;
        for column in columns {
            write!(self.writer, ",{}", column)?;
        }
        writeln!(self.writer, ",elapsed_secs")
    }

    fn write_row(&mut self, snapshot: &EvalSnapshot) -> std::io::Result<()> {
        let columns: Vec<String> = match &self.columns {
            Some(columns) => columns.clone(),
            None => {
                let columns: Vec<String> = snapshot.metrics.keys().cloned().collect();
                self.write_header(&columns)?;
                self.columns = Some(columns.clone());
                columns
            }
        };

        write!(
            self.writer,
            "{},{},{:.8},{:.6}",
            snapshot.trainer, snapshot.step, snapshot.learning_rate, snapshot.train_loss
        )?;
        for column in &columns {
            match snapshot.metrics.get(column) {
                Some(value) => write!(self.writer, ",{:.6}", value)?,
                None => write!(self.writer, ",")?,
            }
        }
        writeln!(
            self.writer,
            ",{:.2}",
            self.start_time.elapsed().as_secs_f32()
        )
    }
}

impl MetricsLogger for CSVLogger {
    fn log(&mut self, snapshot: &EvalSnapshot) {
        if let Err(e) = self.write_row(snapshot) {
            log::warn!("Failed to write metrics row: {}", e);
        }
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CSVLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Multi-logger that writes to multiple backends.
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logger.
    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, snapshot: &EvalSnapshot) {
        for logger in &mut self.loggers {
            logger.log(snapshot);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn snapshot(step: usize, loss: f32) -> EvalSnapshot {
        EvalSnapshot::new("value", step)
            .with_learning_rate(1e-3)
            .with_train_loss(loss)
            .with_metrics(BTreeMap::from([("loss".to_string(), loss)]))
    }

    #[test]
    fn test_eval_snapshot() {
        let s = snapshot(100, 0.5);
        assert_eq!(s.trainer, "value");
        assert_eq!(s.step, 100);
        assert!((s.train_loss - 0.5).abs() < 1e-6);
        assert_eq!(s.metrics.get("loss"), Some(&0.5));
    }

    #[test]
    fn test_csv_logger_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        {
            let mut logger = CSVLogger::new(&path).unwrap();
            logger.log(&snapshot(10, 0.5));
            logger.log(&EvalSnapshot::new("value", 20));
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "trainer,step,learning_rate,train_loss,loss,elapsed_secs");
        assert!(lines[1].starts_with("value,10,0.00100000,0.500000,0.500000,"));
        assert!(lines[2].starts_with("value,20,0.00000000,0.000000,,"));
    }

    #[test]
    fn test_multi_logger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let mut multi = MultiLogger::new()
            .add(LogLogger)
            .add(CSVLogger::new(&path).unwrap());

        multi.log(&snapshot(10, 0.25));
        multi.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
