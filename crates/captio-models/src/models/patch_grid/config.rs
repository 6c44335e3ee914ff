use anyhow::{bail, Result};
use captio_transformers::vision::{EncoderOutputMode, FeatureGeometry, ImageGeometry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchGridConfig {
    pub image_size: usize, // square input side, in pixels
    pub patch_size: usize, // square patch side, in pixels
    pub channels: usize,   // embedding width of each patch
    pub output_mode: EncoderOutputMode,
    pub seed: u64,
    pub layer_norm_eps: f32,
}

impl Default for PatchGridConfig {
    fn default() -> Self {
        Self {
            image_size: 224,
            patch_size: 32,
            channels: 768,
            output_mode: EncoderOutputMode::SpatialGrid,
            seed: 0,
            layer_norm_eps: 1e-5,
        }
    }
}

impl PatchGridConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_size == 0 || self.patch_size == 0 || self.channels == 0 {
            bail!(
                "image_size, patch_size and channels must be positive (got {}, {}, {})",
                self.image_size,
                self.patch_size,
                self.channels
            );
        }
        if self.image_size % self.patch_size != 0 {
            bail!(
                "image_size {} is not divisible by patch_size {}",
                self.image_size,
                self.patch_size
            );
        }
        if !(self.layer_norm_eps > 0.0) {
            bail!("layer_norm_eps must be positive, got {}", self.layer_norm_eps);
        }
        Ok(())
    }

    /// Patches along each side of the image.
    pub fn grid_size(&self) -> usize {
        self.image_size / self.patch_size
    }

    /// Flattened length of one RGB patch.
    pub fn patch_dim(&self) -> usize {
        3 * self.patch_size * self.patch_size
    }

    pub fn input_geometry(&self) -> ImageGeometry {
        ImageGeometry::rgb(self.image_size, self.image_size)
    }

    pub fn feature_geometry(&self) -> FeatureGeometry {
        match self.output_mode {
            EncoderOutputMode::SpatialGrid => {
                FeatureGeometry::new(self.channels, self.grid_size(), self.grid_size())
            }
            EncoderOutputMode::Pooled => FeatureGeometry::new(self.channels, 1, 1),
        }
    }
}
