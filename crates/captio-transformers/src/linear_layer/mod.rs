//! A CPU-based linear layer.
//!
//! All weight tensors are stored in an `[OutFeatures, InFeatures]` layout, the
//! standard layout of safetensors and PyTorch checkpoints. `matmul` performs
//! the transposed multiplication `y = x @ W^T + b` against that layout.

use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;

use crate::utils::init::normal_array2;

/// A CPU-based linear transformation layer (y = xW^T + b).
#[derive(Debug, Clone)]
pub struct LinearLayer {
    weight: Array2<f32>,
    bias: Option<Array1<f32>>,
}

impl LinearLayer {
    /// Creates a new F32 `LinearLayer` from a weight matrix and an optional bias.
    ///
    /// The weight matrix is expected in `[OutFeatures, InFeatures]` layout.
    pub fn new_f32(weight: Array2<f32>, bias: impl Into<Option<Array1<f32>>>) -> Self {
        Self {
            weight,
            bias: bias.into(),
        }
    }

    /// Like `new_f32`, but rejects a bias whose length disagrees with the weight.
    pub fn try_new_f32(weight: Array2<f32>, bias: impl Into<Option<Array1<f32>>>) -> Result<Self> {
        let bias = bias.into();
        if let Some(b) = &bias {
            if b.len() != weight.nrows() {
                return Err(anyhow!(
                    "Bias length {} does not match out_features {}",
                    b.len(),
                    weight.nrows()
                ));
            }
        }
        Ok(Self { weight, bias })
    }

    /// Randomly initialised layer: weights ~ N(0, std), zero bias.
    pub fn random<R: Rng + ?Sized>(
        out_features: usize,
        in_features: usize,
        std: f32,
        with_bias: bool,
        rng: &mut R,
    ) -> Result<Self> {
        let weight = normal_array2((out_features, in_features), std, rng)?;
        let bias = with_bias.then(|| Array1::zeros(out_features));
        Ok(Self { weight, bias })
    }

    /// Computes `y = x @ W^T + b`.
    ///
    /// Panics if the input's trailing dimension differs from `in_features`;
    /// use `try_matmul` when the input shape is not already validated.
    #[inline]
    pub fn matmul(&self, input: &ArrayView2<f32>) -> Array2<f32> {
        let mut result = input.dot(&self.weight.t());

        if let Some(b) = &self.bias {
            result.outer_iter_mut().for_each(|mut row| row += b);
        }

        result
    }

    /// Checked variant of `matmul`.
    pub fn try_matmul(&self, input: &ArrayView2<f32>) -> Result<Array2<f32>> {
        if input.ncols() != self.in_features() {
            return Err(anyhow!(
                "Linear layer expects {} input features, got {}",
                self.in_features(),
                input.ncols()
            ));
        }
        Ok(self.matmul(input))
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.out_features(), self.in_features()]
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Array1<f32>> {
        self.bias.as_ref()
    }
}

#[cfg(test)]
mod tests;
