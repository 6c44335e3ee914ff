use std::fmt;

use anyhow::Result;
use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};

/// Pixel geometry an encoder accepts, `[channels, height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageGeometry {
    /// 3-channel image of the given size.
    pub fn rgb(height: usize, width: usize) -> Self {
        Self {
            channels: 3,
            height,
            width,
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}

impl fmt::Display for ImageGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

/// Shape of the feature grid an encoder produces per image,
/// `[channels, height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGeometry {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl FeatureGeometry {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Length of one image's grid after flattening.
    pub fn flat_len(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    pub fn is_empty(&self) -> bool {
        self.flat_len() == 0
    }
}

impl Default for FeatureGeometry {
    /// 768 channels on a 7x7 grid: the last stage of a TinyViT-21M style backbone.
    fn default() -> Self {
        Self::new(768, 7, 7)
    }
}

impl fmt::Display for FeatureGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

/// Whether an encoder keeps its spatial grid or averages it away.
///
/// Classification backbones usually finish with a global average; captioning
/// needs the grid, so the choice is part of the encoder's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderOutputMode {
    /// Return the full `[channels, height, width]` grid.
    #[default]
    SpatialGrid,
    /// Average over the spatial axes, giving a `[channels, 1, 1]` grid.
    Pooled,
}

/// A pretrained vision backbone.
pub trait VisionEncoder: Send + Sync {
    /// The per-image input shape `forward` accepts.
    fn input_geometry(&self) -> ImageGeometry;

    /// The per-image shape `forward` returns, already accounting for
    /// `output_mode`.
    fn feature_geometry(&self) -> FeatureGeometry;

    fn output_mode(&self) -> EncoderOutputMode {
        EncoderOutputMode::SpatialGrid
    }

    /// Encodes `[batch, channels, height, width]` images into
    /// `[batch, feature_channels, grid_height, grid_width]`.
    fn forward(&self, images: &ArrayView4<f32>) -> Result<Array4<f32>>;
}
