//! Pooling strategies for vision encoder outputs.

use ndarray::{Array4, ArrayView4, Axis};

/// Averages a `[batch, channels, height, width]` grid over its spatial axes.
///
/// Returns `[batch, channels, 1, 1]` so pooled and unpooled outputs share a rank.
pub fn spatial_mean_pool(grid: &ArrayView4<f32>) -> Array4<f32> {
    let (batch, channels, height, width) = grid.dim();
    if height == 0 || width == 0 {
        return Array4::zeros((batch, channels, 1, 1));
    }
    let summed = grid.sum_axis(Axis(3)).sum_axis(Axis(2));
    let pooled = summed / (height * width) as f32;
    pooled.insert_axis(Axis(2)).insert_axis(Axis(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_spatial_mean_pool_basic() {
        // batch 1, 2 channels, 2x2 grid
        let grid = Array4::from_shape_vec(
            (1, 2, 2, 2),
            vec![1.0, 2.0, 3.0, 4.0, 10.0, 10.0, 10.0, 10.0],
        )
        .unwrap();
        let pooled = spatial_mean_pool(&grid.view());
        assert_eq!(pooled.shape(), &[1, 2, 1, 1]);
        assert_abs_diff_eq!(pooled[[0, 0, 0, 0]], 2.5);
        assert_abs_diff_eq!(pooled[[0, 1, 0, 0]], 10.0);
    }

    #[test]
    fn test_spatial_mean_pool_keeps_batch() {
        let grid = Array4::<f32>::ones((3, 4, 7, 7));
        let pooled = spatial_mean_pool(&grid.view());
        assert_eq!(pooled.shape(), &[3, 4, 1, 1]);
        assert!(pooled.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }
}
