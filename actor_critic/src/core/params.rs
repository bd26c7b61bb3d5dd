//! Explicit per-layer weight and state snapshots.
//!
//! A [`ModelParams`] is an owned, ordered list of layers, each an ordered list
//! of flattened tensors. Copying a layer range between two snapshots is a
//! whole-value replacement: the destination never aliases mutable data of the
//! source because burn tensors are immutable values.

use std::ops::Range;

use burn::tensor::{backend::Backend, Tensor};

use crate::error::{ActorCriticError, ParamsError};

/// A parameter flattened to 1D, with its original shape.
#[derive(Debug, Clone)]
pub struct ParamTensor<B: Backend> {
    values: Tensor<B, 1>,
    shape: Vec<usize>,
}

impl<B: Backend> ParamTensor<B> {
    /// Flatten a tensor of any rank.
    pub fn from_tensor<const D: usize>(tensor: Tensor<B, D>) -> Self {
        let dims = tensor.dims();
        let total: usize = dims.iter().product();
        Self {
            values: tensor.reshape([total]),
            shape: dims.to_vec(),
        }
    }

    /// Restore the original rank; `None` when `D` does not match it.
    pub fn to_tensor<const D: usize>(&self) -> Option<Tensor<B, D>> {
        let dims: [usize; D] = self.shape.as_slice().try_into().ok()?;
        Some(self.values.clone().reshape(dims))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &Tensor<B, 1> {
        &self.values
    }

    /// Host copy of the values.
    pub fn to_vec(&self) -> Result<Vec<f32>, ActorCriticError> {
        self.values
            .clone()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ActorCriticError::Tensor(format!("{:?}", e)))
    }
}

/// Parameters of one layer, in traversal order.
#[derive(Debug, Clone)]
pub struct LayerParams<B: Backend> {
    pub tensors: Vec<ParamTensor<B>>,
}

impl<B: Backend> LayerParams<B> {
    pub fn new(tensors: Vec<ParamTensor<B>>) -> Self {
        Self { tensors }
    }

    /// A layer without parameters (or without state).
    pub fn empty() -> Self {
        Self {
            tensors: Vec::new(),
        }
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.tensors.iter().map(|t| t.shape.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// Per-layer snapshot of a model's weights or state.
#[derive(Debug, Clone)]
pub struct ModelParams<B: Backend> {
    layers: Vec<LayerParams<B>>,
}

impl<B: Backend> ModelParams<B> {
    pub fn new(layers: Vec<LayerParams<B>>) -> Self {
        Self { layers }
    }

    /// `n_layers` empty layers, the state of a stateless model.
    pub fn empty(n_layers: usize) -> Self {
        Self {
            layers: (0..n_layers).map(|_| LayerParams::empty()).collect(),
        }
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[LayerParams<B>] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&LayerParams<B>> {
        self.layers.get(index)
    }

    /// Total number of tensors over all layers.
    pub fn n_tensors(&self) -> usize {
        self.layers.iter().map(|l| l.tensors.len()).sum()
    }

    /// All tensors in traversal order.
    pub fn flatten(&self) -> impl Iterator<Item = &ParamTensor<B>> {
        self.layers.iter().flat_map(|l| l.tensors.iter())
    }

    /// Replace layers `range` with the source's layers.
    ///
    /// Both snapshots must contain the range and agree on the parameter shapes
    /// of every layer in it; nothing is modified otherwise.
    pub fn copy_layers_from(
        &mut self,
        source: &ModelParams<B>,
        range: Range<usize>,
    ) -> Result<(), ParamsError> {
        check_range(&range, source.n_layers())?;
        check_range(&range, self.n_layers())?;
        for layer in range.clone() {
            let from = source.layers[layer].shapes();
            let to = self.layers[layer].shapes();
            if from != to {
                return Err(ParamsError::LayerMismatch { layer, from, to });
            }
        }
        for layer in range {
            self.layers[layer] = source.layers[layer].clone();
        }
        Ok(())
    }

    /// Whether layers `range` hold bit-identical values in both snapshots.
    pub fn layers_equal(
        &self,
        other: &ModelParams<B>,
        range: Range<usize>,
    ) -> Result<bool, ActorCriticError> {
        check_range(&range, self.n_layers())?;
        check_range(&range, other.n_layers())?;
        for layer in range {
            let (a, b) = (&self.layers[layer], &other.layers[layer]);
            if a.shapes() != b.shapes() {
                return Ok(false);
            }
            for (x, y) in a.tensors.iter().zip(&b.tensors) {
                let same = x
                    .to_vec()?
                    .iter()
                    .zip(y.to_vec()?.iter())
                    .all(|(p, q)| p.to_bits() == q.to_bits());
                if !same {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

fn check_range(range: &Range<usize>, n_layers: usize) -> Result<(), ParamsError> {
    if range.start > range.end || range.end > n_layers {
        return Err(ParamsError::LayerRange {
            start: range.start,
            end: range.end,
            n_layers,
        });
    }
    Ok(())
}
