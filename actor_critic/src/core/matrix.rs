//! Host-side `[batch, time]` matrices.
//!
//! Advantage estimators run sequential recurrences over time, which is simpler
//! and cheaper on the host than as tensor ops. [`StepMatrix`] is the row-major
//! buffer they read and write; conversion to and from burn tensors happens at
//! the batch-builder boundary.

use burn::tensor::{backend::Backend, Tensor, TensorData};

use crate::error::{ActorCriticError, ShapeError};

/// Row-major `[rows, cols]` matrix of `f32`, one row per trajectory slice.
#[derive(Debug, Clone, PartialEq)]
pub struct StepMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl StepMatrix {
    /// Create a matrix from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, ShapeError> {
        if data.len() != rows * cols {
            return Err(ShapeError::MatrixData {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from equally long rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, ShapeError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let data: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(rows.len(), cols, data)
    }

    /// Read a `[batch, time]` tensor back to the host.
    pub fn from_tensor<B: Backend>(tensor: Tensor<B, 2>) -> Result<Self, ActorCriticError> {
        let [rows, cols] = tensor.dims();
        let data = tensor
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ActorCriticError::Tensor(format!("{:?}", e)))?;
        Ok(Self::new(rows, cols, data)?)
    }

    /// Upload to a `[rows, cols]` tensor on `device`.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::from_data(
            TensorData::new(self.data.clone(), [self.rows, self.cols]),
            device,
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    /// One row (one trajectory slice).
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Keep the first `cols` columns of every row.
    pub fn truncate_cols(&self, cols: usize) -> Self {
        let cols = cols.min(self.cols);
        let data = (0..self.rows)
            .flat_map(|r| self.row(r)[..cols].iter().copied())
            .collect();
        Self {
            rows: self.rows,
            cols,
            data,
        }
    }

    /// Mean over all entries (0 for an empty matrix).
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Population standard deviation over all entries.
    pub fn std(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance =
            self.data.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / self.data.len() as f32;
        variance.sqrt()
    }

    /// Elementwise map.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }
}
