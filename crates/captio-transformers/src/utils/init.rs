//! Seeded weight initialisation.

use anyhow::{anyhow, bail, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Deterministic generator for reproducible initial weights.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn normal(std: f32) -> Result<Normal<f32>> {
    if !(std.is_finite() && std >= 0.0) {
        bail!("Invalid init std {}: must be finite and non-negative", std);
    }
    Normal::new(0.0, std).map_err(|e| anyhow!("Invalid init std {}: {}", std, e))
}

/// `[rows, cols]` matrix drawn from N(0, std).
pub fn normal_array2<R: Rng + ?Sized>(
    shape: (usize, usize),
    std: f32,
    rng: &mut R,
) -> Result<Array2<f32>> {
    let dist = normal(std)?;
    Ok(Array2::from_shape_simple_fn(shape, || dist.sample(&mut *rng)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_weights() {
        let a = normal_array2((3, 5), 0.02, &mut seeded_rng(42)).unwrap();
        let b = normal_array2((3, 5), 0.02, &mut seeded_rng(42)).unwrap();
        assert_eq!(a, b);
        let c = normal_array2((3, 5), 0.02, &mut seeded_rng(43)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_std_scales_values() {
        let v = normal_array2((100, 100), 0.02, &mut seeded_rng(0)).unwrap();
        let max = v.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!(max < 0.2);
    }

    #[test]
    fn test_negative_std_is_rejected() {
        assert!(normal_array2((2, 2), -1.0, &mut seeded_rng(0)).is_err());
        assert!(normal_array2((2, 2), f32::NAN, &mut seeded_rng(0)).is_err());
        assert!(normal_array2((2, 2), f32::INFINITY, &mut seeded_rng(0)).is_err());
    }

    #[test]
    fn test_zero_std_gives_zeros() {
        let v = normal_array2((2, 3), 0.0, &mut seeded_rng(5)).unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
