//! Utility modules

pub mod init;

use anyhow::Result;
use ndarray::{Array2, ArrayView4};

/// Flattens every non-batch axis of a `[batch, c, h, w]` tensor in row-major
/// order, giving `[batch, c * h * w]`.
pub fn flatten_trailing(grid: &ArrayView4<f32>) -> Result<Array2<f32>> {
    let (batch, c, h, w) = grid.dim();
    let owned = grid.as_standard_layout().into_owned();
    Ok(owned.into_shape_with_order((batch, c * h * w))?)
}
