//! Step-indexed model checkpoints under a trainer's output directory.
//!
//! Files are named `model_{step:08}.bin` so that lexical and numeric order
//! agree. The directory itself is the source of truth: a checkpointer opened
//! on a directory from an earlier run sees (and prunes) its files too.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;

const PREFIX: &str = "model_";
const SUFFIX: &str = ".bin";

/// Where checkpoints go and how many survive pruning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointerConfig {
    pub dir: PathBuf,
    /// Most recent checkpoints retained; 0 keeps every one.
    pub keep_last_n: usize,
}

impl CheckpointerConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            keep_last_n: 5,
        }
    }

    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum CheckpointError {
    /// The checkpoint directory could not be created or scanned.
    Dir { dir: PathBuf, source: io::Error },
    /// Writing the checkpoint of `step` failed.
    Save { step: usize, message: String },
    /// Reading a checkpoint file back failed.
    Load { path: PathBuf, message: String },
    /// Pruning an old checkpoint failed.
    Prune { path: PathBuf, source: io::Error },
    /// The directory holds no checkpoint.
    Empty { dir: PathBuf },
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Dir { dir, source } => {
                write!(f, "checkpoint dir {}: {}", dir.display(), source)
            }
            CheckpointError::Save { step, message } => {
                write!(f, "saving checkpoint of step {}: {}", step, message)
            }
            CheckpointError::Load { path, message } => {
                write!(f, "loading {}: {}", path.display(), message)
            }
            CheckpointError::Prune { path, source } => {
                write!(f, "removing {}: {}", path.display(), source)
            }
            CheckpointError::Empty { dir } => {
                write!(f, "no checkpoint in {}", dir.display())
            }
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckpointError::Dir { source, .. } | CheckpointError::Prune { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Checkpointer
// ============================================================================

/// A checkpoint file and the trainer step it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInfo {
    pub path: PathBuf,
    pub step: usize,
}

/// Writes, prunes and restores step-indexed checkpoints.
pub struct Checkpointer {
    config: CheckpointerConfig,
    steps: BTreeSet<usize>,
}

impl Checkpointer {
    /// Open `config.dir`, creating it when missing.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.dir).map_err(|source| CheckpointError::Dir {
            dir: config.dir.clone(),
            source,
        })?;
        let steps = scan_steps(&config.dir)?;
        Ok(Self { config, steps })
    }

    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    pub fn path_for(&self, step: usize) -> PathBuf {
        self.config
            .dir
            .join(format!("{}{:08}{}", PREFIX, step, SUFFIX))
    }

    /// Checkpoints on disk, oldest step first.
    pub fn list(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        Ok(scan_steps(&self.config.dir)?
            .into_iter()
            .map(|step| CheckpointInfo {
                path: self.path_for(step),
                step,
            })
            .collect())
    }

    pub fn latest(&self) -> Result<CheckpointInfo, CheckpointError> {
        self.list()?.pop().ok_or_else(|| CheckpointError::Empty {
            dir: self.config.dir.clone(),
        })
    }

    /// Record `model` as the checkpoint of `step`, then prune.
    pub fn save<B: Backend, M: Module<B>>(
        &mut self,
        model: &M,
        step: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let path = self.path_for(step);
        model
            .clone()
            .save_file(&path, &BinFileRecorder::<FullPrecisionSettings>::new())
            .map_err(|e| CheckpointError::Save {
                step,
                message: e.to_string(),
            })?;
        self.steps.insert(step);
        self.prune()?;

        log::debug!("checkpoint written: {}", path.display());
        Ok(path)
    }

    /// Load `path` into a model of the same architecture as `template`.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        template: M,
        path: &Path,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        template
            .load_file(
                path.to_path_buf(),
                &BinFileRecorder::<FullPrecisionSettings>::new(),
                device,
            )
            .map_err(|e| CheckpointError::Load {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    /// The latest checkpoint loaded into `template`, with its step.
    pub fn restore_latest<B: Backend, M: Module<B>>(
        &self,
        template: M,
        device: &B::Device,
    ) -> Result<(M, usize), CheckpointError> {
        let latest = self.latest()?;
        let model = self.load(template, &latest.path, device)?;
        Ok((model, latest.step))
    }

    fn prune(&mut self) -> Result<(), CheckpointError> {
        let keep = self.config.keep_last_n;
        while keep > 0 && self.steps.len() > keep {
            let Some(oldest) = self.steps.pop_first() else {
                break;
            };
            let path = self.path_for(oldest);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(CheckpointError::Prune { path, source }),
            }
        }
        Ok(())
    }
}

fn scan_steps(dir: &Path) -> Result<BTreeSet<usize>, CheckpointError> {
    let entries = fs::read_dir(dir).map_err(|source| CheckpointError::Dir {
        dir: dir.to_path_buf(),
        source,
    })?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()?
                .strip_prefix(PREFIX)?
                .strip_suffix(SUFFIX)?
                .parse()
                .ok()
        })
        .collect())
}
