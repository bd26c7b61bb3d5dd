//! Extract and load [`ModelParams`] from burn modules.
//!
//! Parameters are visited with a [`ModuleMapper`] in traversal order, which is
//! deterministic for modules of the same architecture, then grouped into
//! layers with [`LayeredModel::layer_param_counts`]. Loading keeps each
//! parameter's id, so optimizer state keyed by id survives a weight copy.

use burn::module::{ModuleMapper, Param};
use burn::prelude::*;

use crate::core::params::{LayerParams, ModelParams, ParamTensor};
use crate::error::ParamsError;
use crate::model::LayeredModel;

// ============================================================================
// Extraction
// ============================================================================

struct ParamExtractor<B: Backend> {
    params: Vec<ParamTensor<B>>,
}

impl<B: Backend> ModuleMapper<B> for ParamExtractor<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        self.params.push(ParamTensor::from_tensor(param.val().detach()));
        param
    }
}

/// Snapshot a module's weights grouped per layer.
pub fn module_weights<B, M>(module: &M) -> Result<ModelParams<B>, ParamsError>
where
    B: Backend,
    M: LayeredModel<B>,
{
    let mut extractor = ParamExtractor { params: Vec::new() };
    let _ = module.clone().map(&mut extractor);

    let counts = module.layer_param_counts();
    let expected: usize = counts.iter().sum();
    if expected != extractor.params.len() {
        return Err(ParamsError::Layout {
            expected_params: expected,
            found_params: extractor.params.len(),
        });
    }

    let mut params = extractor.params.into_iter();
    let layers = counts
        .iter()
        .map(|&n| LayerParams::new(params.by_ref().take(n).collect()))
        .collect();
    Ok(ModelParams::new(layers))
}

// ============================================================================
// Loading
// ============================================================================

struct ParamLoader<'a, B: Backend> {
    params: Vec<&'a ParamTensor<B>>,
    index: usize,
    error: Option<ParamsError>,
}

impl<B: Backend> ModuleMapper<B> for ParamLoader<'_, B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let idx = self.index;
        self.index += 1;
        if self.error.is_some() {
            return param;
        }

        let current = param.val();
        let dims = current.dims();
        let Some(source) = self.params.get(idx) else {
            // Counted after traversal.
            return param;
        };
        if source.shape() != dims.as_slice() {
            self.error = Some(ParamsError::ParamShape {
                index: idx,
                expected: dims.to_vec(),
                actual: source.shape().to_vec(),
            });
            return param;
        }

        let mut value = source.values().clone().reshape(dims).detach();
        if current.is_require_grad() {
            value = value.require_grad();
        }
        Param::initialized(param.id.clone(), value)
    }
}

/// Replace the module's weights with `weights`, keeping parameter ids.
pub fn load_module_weights<B, M>(module: M, weights: &ModelParams<B>) -> Result<M, ParamsError>
where
    B: Backend,
    M: LayeredModel<B>,
{
    let expected: usize = module.layer_param_counts().iter().sum();
    if expected != weights.n_tensors() {
        return Err(ParamsError::Layout {
            expected_params: expected,
            found_params: weights.n_tensors(),
        });
    }

    let mut loader = ParamLoader {
        params: weights.flatten().collect(),
        index: 0,
        error: None,
    };
    let module = module.map(&mut loader);
    if let Some(e) = loader.error {
        return Err(e);
    }
    if loader.index != loader.params.len() {
        return Err(ParamsError::Layout {
            expected_params: loader.index,
            found_params: loader.params.len(),
        });
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TinyValueNet, B};

    #[test]
    fn test_weights_grouped_per_layer() {
        let net = TinyValueNet::<B>::new(3, 4, &Default::default());
        let weights = module_weights(&net).unwrap();
        assert_eq!(weights.n_layers(), 2);
        assert_eq!(
            weights.layers()[0].shapes(),
            vec![vec![3, 4], vec![4]]
        );
        assert_eq!(weights.layers()[1].shapes(), vec![vec![4, 1], vec![1]]);
    }

    #[test]
    fn test_load_replaces_values_and_keeps_ids() {
        let device = Default::default();
        let source = TinyValueNet::<B>::new(3, 4, &device);
        let dest = TinyValueNet::<B>::new(3, 4, &device);
        let ids_before = dest.hidden.weight.id.clone();

        let loaded = load_module_weights(dest, &module_weights(&source).unwrap()).unwrap();

        assert_eq!(loaded.hidden.weight.id, ids_before);
        let got = module_weights(&loaded).unwrap();
        assert!(got
            .layers_equal(&module_weights(&source).unwrap(), 0..2)
            .unwrap());
    }

    #[test]
    fn test_load_rejects_other_architecture() {
        let device = Default::default();
        let source = TinyValueNet::<B>::new(5, 4, &device);
        let dest = TinyValueNet::<B>::new(3, 4, &device);
        let err = load_module_weights(dest, &module_weights(&source).unwrap()).unwrap_err();
        assert!(matches!(err, ParamsError::ParamShape { index: 0, .. }));
    }
}
