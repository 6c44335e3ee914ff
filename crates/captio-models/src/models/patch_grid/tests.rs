use anyhow::Result;
use approx::assert_abs_diff_eq;
use captio_transformers::vision::{EncoderOutputMode, FeatureGeometry, VisionEncoder};
use ndarray::{Array4, Axis};

use super::{PatchGridConfig, PatchGridEncoder};

fn small_config() -> PatchGridConfig {
    PatchGridConfig {
        image_size: 8,
        patch_size: 4,
        channels: 6,
        ..Default::default()
    }
}

fn ramp_images(batch: usize, size: usize) -> Array4<f32> {
    Array4::from_shape_fn((batch, 3, size, size), |(b, c, y, x)| {
        ((b * 31 + c * 7 + y * 3 + x) % 17) as f32 / 17.0
    })
}

#[test]
fn test_default_config_matches_tinyvit_geometry() {
    let config = PatchGridConfig::default();
    assert_eq!(config.grid_size(), 7);
    assert_eq!(config.feature_geometry(), FeatureGeometry::new(768, 7, 7));
    assert_eq!(config.feature_geometry().flat_len(), 37632);
}

#[test]
fn test_forward_shape() -> Result<()> {
    let encoder = PatchGridEncoder::new(small_config())?;
    let out = encoder.forward(&ramp_images(2, 8).view())?;
    assert_eq!(out.shape(), &[2, 6, 2, 2]);
    assert_eq!(encoder.feature_geometry().dims(), [6, 2, 2]);
    Ok(())
}

#[test]
fn test_channels_are_layer_normalized() -> Result<()> {
    let encoder = PatchGridEncoder::new(small_config())?;
    let out = encoder.forward(&ramp_images(1, 8).view())?;

    // every grid cell's channel vector has zero mean
    for y in 0..2 {
        for x in 0..2 {
            let cell = out.slice(ndarray::s![0, .., y, x]);
            let mean = cell.sum() / cell.len() as f32;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-4);
        }
    }
    Ok(())
}

#[test]
fn test_pooled_mode_averages_grid() -> Result<()> {
    let grid_encoder = PatchGridEncoder::new(small_config())?;
    let pooled_encoder = PatchGridEncoder::new(PatchGridConfig {
        output_mode: EncoderOutputMode::Pooled,
        ..small_config()
    })?;

    assert_eq!(pooled_encoder.output_mode(), EncoderOutputMode::Pooled);
    assert_eq!(pooled_encoder.feature_geometry(), FeatureGeometry::new(6, 1, 1));

    let images = ramp_images(2, 8);
    let grid = grid_encoder.forward(&images.view())?;
    let pooled = pooled_encoder.forward(&images.view())?;
    assert_eq!(pooled.shape(), &[2, 6, 1, 1]);

    let expected = grid
        .mean_axis(Axis(3))
        .and_then(|a| a.mean_axis(Axis(2)))
        .unwrap();
    for b in 0..2 {
        for c in 0..6 {
            assert_abs_diff_eq!(pooled[[b, c, 0, 0]], expected[[b, c]], epsilon = 1e-5);
        }
    }
    Ok(())
}

#[test]
fn test_same_seed_is_deterministic() -> Result<()> {
    let images = ramp_images(1, 8);
    let a = PatchGridEncoder::new(small_config())?.forward(&images.view())?;
    let b = PatchGridEncoder::new(small_config())?.forward(&images.view())?;
    assert_eq!(a, b);

    let c = PatchGridEncoder::new(PatchGridConfig {
        seed: 7,
        ..small_config()
    })?
    .forward(&images.view())?;
    assert_ne!(a, c);
    Ok(())
}

#[test]
fn test_batch_items_are_independent() -> Result<()> {
    let encoder = PatchGridEncoder::new(small_config())?;
    let images = ramp_images(3, 8);
    let batched = encoder.forward(&images.view())?;
    let single = encoder.forward(&images.slice(ndarray::s![1..2, .., .., ..]))?;
    for (x, y) in batched.index_axis(Axis(0), 1).iter().zip(single.iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_rejects_wrong_input_size() -> Result<()> {
    let encoder = PatchGridEncoder::new(small_config())?;
    let err = encoder
        .forward(&Array4::<f32>::zeros((1, 3, 12, 12)).view())
        .unwrap_err();
    assert!(err.to_string().contains("3x8x8"));
    Ok(())
}

#[test]
fn test_invalid_configs_rejected() {
    let indivisible = PatchGridConfig {
        image_size: 10,
        patch_size: 4,
        ..small_config()
    };
    assert!(PatchGridEncoder::new(indivisible).is_err());

    let zero_channels = PatchGridConfig {
        channels: 0,
        ..small_config()
    };
    assert!(PatchGridEncoder::new(zero_channels).is_err());
}

#[test]
fn test_config_from_json() -> Result<()> {
    let config = PatchGridConfig::from_json(
        r#"{ "image_size": 64, "patch_size": 16, "channels": 32, "output_mode": "pooled" }"#,
    )?;
    assert_eq!(config.grid_size(), 4);
    assert_eq!(config.output_mode, EncoderOutputMode::Pooled);
    assert_eq!(config.seed, 0);
    Ok(())
}
