//! Tests for the algorithms module.
//!
//! # Test Organization
//!
//! - `advantage_tests`: advantage estimators and their output lengths
//! - `policy_loss_tests`: A2C / PPO / AWR / value losses
//! - `policy_input_tests`: truncation and shape checks of policy inputs
//! - `pipeline_tests`: normalization and metrics of the loss pipeline

pub mod pipeline_tests;

use burn::prelude::*;
use burn::tensor::ElementConversion;

use crate::testing::B;

pub(crate) fn tensor2(rows: &[Vec<f32>]) -> Tensor<B, 2> {
    let cols = rows.first().map_or(0, Vec::len);
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    Tensor::from_data(TensorData::new(data, [rows.len(), cols]), &Default::default())
}

pub(crate) fn scalar(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

pub(crate) fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-4, "{:?} != {:?}", actual, expected);
    }
}
