//! Activation functions.

use ndarray::{ArrayBase, DataMut, Dimension};

const SQRT_2_OVER_PI: f32 = 0.7978845608;
const GELU_COEFF: f32 = 0.044715;

/// GELU, tanh approximation (the "gelu_new" variant used by GPT-2 and ViT ports).
#[inline(always)]
pub fn gelu_new_scalar(x: f32) -> f32 {
    let x_cubed = x * x * x;
    let inner = SQRT_2_OVER_PI * (x + GELU_COEFF * x_cubed);
    0.5 * x * (1.0 + inner.tanh())
}

/// Applies GELU in-place to an array of any rank.
pub fn gelu_inplace<S, D>(x: &mut ArrayBase<S, D>)
where
    S: DataMut<Elem = f32>,
    D: Dimension,
{
    x.mapv_inplace(gelu_new_scalar);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn test_gelu_fixed_points() {
        assert_abs_diff_eq!(gelu_new_scalar(0.0), 0.0);
        // Large positive inputs pass through, large negative inputs vanish
        assert_abs_diff_eq!(gelu_new_scalar(10.0), 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(gelu_new_scalar(-10.0), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(gelu_new_scalar(1.0), 0.841192, epsilon = 1e-5);
    }

    #[test]
    fn test_gelu_inplace_2d() {
        let mut x = Array2::from_elem((2, 3), 1.0f32);
        gelu_inplace(&mut x);
        assert!(x.iter().all(|&v| (v - 0.841192).abs() < 1e-5));
    }
}
