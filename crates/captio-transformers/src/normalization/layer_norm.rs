//! Layer normalization implementation

use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Layer normalization over the last axis.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    pub weight: Array1<f32>,
    pub bias: Array1<f32>,
    pub eps: f32,
}

impl LayerNorm {
    pub fn new(weight: Array1<f32>, bias: Array1<f32>, eps: f32) -> Self {
        Self { weight, bias, eps }
    }

    /// Unit scale, zero shift.
    pub fn identity(hidden_size: usize, eps: f32) -> Self {
        Self::new(Array1::ones(hidden_size), Array1::zeros(hidden_size), eps)
    }

    pub fn hidden_size(&self) -> usize {
        self.weight.len()
    }

    /// Apply layer norm to `[rows, hidden]` activations.
    pub fn forward_2d(&self, hidden_states: &ArrayView2<f32>) -> Result<Array2<f32>> {
        if hidden_states.ncols() != self.hidden_size() {
            return Err(anyhow!(
                "LayerNorm expects hidden size {}, got {}",
                self.hidden_size(),
                hidden_states.ncols()
            ));
        }
        let mean = hidden_states
            .mean_axis(Axis(1))
            .ok_or_else(|| anyhow!("LayerNorm over an empty axis"))?;
        let variance = hidden_states.var_axis(Axis(1), 0.0);

        let mean_expanded = mean.insert_axis(Axis(1));
        let inv_std = variance
            .mapv(|v| 1.0 / (v + self.eps).sqrt())
            .insert_axis(Axis(1));
        let normalized = (hidden_states - &mean_expanded) * &inv_std;

        Ok(normalized * &self.weight + &self.bias)
    }

    /// Apply layer norm to a `[batch, seq, hidden]` tensor.
    pub fn forward(&self, hidden_states: &ArrayView3<f32>) -> Result<Array3<f32>> {
        let (batch, seq, hidden) = hidden_states.dim();
        let rows = hidden_states
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((batch * seq, hidden))?;
        let out = self.forward_2d(&rows.view())?;
        Ok(out.into_shape_with_order((batch, seq, hidden))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array3};

    #[test]
    fn test_layer_norm_basic() {
        let layer_norm = LayerNorm::identity(3, 1e-6);
        let input = arr2(&[[1.0, 2.0, 3.0]]);

        let output = layer_norm.forward_2d(&input.view()).unwrap();

        // Zero mean, unit variance
        let row = output.row(0);
        assert_abs_diff_eq!(row.sum(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(row[0], -1.2247, epsilon = 1e-3);
        assert_abs_diff_eq!(row[2], 1.2247, epsilon = 1e-3);
    }

    #[test]
    fn test_layer_norm_scale_and_shift() {
        let layer_norm = LayerNorm::new(arr1(&[2.0, 2.0]), arr1(&[1.0, 1.0]), 1e-6);
        let output = layer_norm.forward_2d(&arr2(&[[0.0, 2.0]]).view()).unwrap();
        // normalized [-1, 1] -> scaled [-2, 2] -> shifted [-1, 3]
        assert_abs_diff_eq!(output[[0, 0]], -1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(output[[0, 1]], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_layer_norm_3d_matches_2d() {
        let layer_norm = LayerNorm::identity(4, 1e-5);
        let input = Array3::from_shape_fn((2, 3, 4), |(b, s, h)| (b * 12 + s * 4 + h) as f32);
        let out3 = layer_norm.forward(&input.view()).unwrap();
        let row = layer_norm
            .forward_2d(&input.slice(ndarray::s![1, 2..3, ..]))
            .unwrap();
        for h in 0..4 {
            assert_abs_diff_eq!(out3[[1, 2, h]], row[[0, h]], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_layer_norm_rejects_wrong_width() {
        let layer_norm = LayerNorm::identity(3, 1e-6);
        assert!(layer_norm.forward_2d(&arr2(&[[1.0, 2.0]]).view()).is_err());
    }
}
