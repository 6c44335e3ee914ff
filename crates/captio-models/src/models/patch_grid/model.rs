use anyhow::{anyhow, bail, Result};
use captio_transformers::activations::gelu_inplace;
use captio_transformers::linear_layer::LinearLayer;
use captio_transformers::normalization::LayerNorm;
use captio_transformers::pooling::spatial_mean_pool;
use captio_transformers::utils::init::{normal_array2, seeded_rng};
use captio_transformers::vision::{EncoderOutputMode, FeatureGeometry, ImageGeometry, VisionEncoder};
use ndarray::{s, Array2, Array4, ArrayView4, Axis};

use super::config::PatchGridConfig;

const INIT_STD: f32 = 0.02;

pub struct PatchGridEncoder {
    config: PatchGridConfig,
    patch_embedding: LinearLayer,    // [channels, patch_dim]
    position_embedding: Array2<f32>, // [grid * grid, channels]
    norm: LayerNorm,
}

impl PatchGridEncoder {
    pub fn new(config: PatchGridConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = seeded_rng(config.seed);
        let patch_embedding =
            LinearLayer::random(config.channels, config.patch_dim(), INIT_STD, true, &mut rng)?;
        let num_patches = config.grid_size() * config.grid_size();
        let position_embedding =
            normal_array2((num_patches, config.channels), INIT_STD, &mut rng)?;
        let norm = LayerNorm::identity(config.channels, config.layer_norm_eps);

        log::info!(
            "Built PatchGridEncoder: {}px input, {}px patches, output {} ({:?})",
            config.image_size,
            config.patch_size,
            config.feature_geometry(),
            config.output_mode
        );

        Ok(Self {
            config,
            patch_embedding,
            position_embedding,
            norm,
        })
    }

    pub fn config(&self) -> &PatchGridConfig {
        &self.config
    }

    pub fn grid_size(&self) -> usize {
        self.config.grid_size()
    }

    /// Rearranges `[batch, 3, S, S]` into one row per patch,
    /// `[batch * grid * grid, 3 * patch * patch]`, patches in row-major grid order.
    fn extract_patches(&self, images: &ArrayView4<f32>) -> Array2<f32> {
        let batch = images.shape()[0];
        let p = self.config.patch_size;
        let g = self.grid_size();
        let mut patches = Array2::<f32>::zeros((batch * g * g, self.config.patch_dim()));

        for b in 0..batch {
            for gy in 0..g {
                for gx in 0..g {
                    let (y0, x0) = (gy * p, gx * p);
                    let patch = images.slice(s![b, .., y0..y0 + p, x0..x0 + p]);
                    let row_idx = (b * g + gy) * g + gx;
                    patches
                        .row_mut(row_idx)
                        .iter_mut()
                        .zip(patch.iter())
                        .for_each(|(dst, src)| *dst = *src);
                }
            }
        }
        patches
    }
}

impl VisionEncoder for PatchGridEncoder {
    fn input_geometry(&self) -> ImageGeometry {
        self.config.input_geometry()
    }

    fn feature_geometry(&self) -> FeatureGeometry {
        self.config.feature_geometry()
    }

    fn output_mode(&self) -> EncoderOutputMode {
        self.config.output_mode
    }

    fn forward(&self, images: &ArrayView4<f32>) -> Result<Array4<f32>> {
        let expected = self.input_geometry();
        let (batch, c, h, w) = images.dim();
        if [c, h, w] != expected.dims() {
            bail!(
                "PatchGridEncoder expects images of {}, got {}x{}x{}",
                expected,
                c,
                h,
                w
            );
        }

        let g = self.grid_size();
        let channels = self.config.channels;

        let patches = self.extract_patches(images);
        let mut hidden = self.patch_embedding.try_matmul(&patches.view())?;
        gelu_inplace(&mut hidden);

        // add the same position table to each image's patches
        for mut image_rows in hidden.axis_chunks_iter_mut(Axis(0), g * g) {
            image_rows += &self.position_embedding;
        }

        let hidden = self.norm.forward_2d(&hidden.view())?;

        // [b * g * g, C] -> [b, g, g, C] -> [b, C, g, g]
        let grid = hidden
            .into_shape_with_order((batch, g, g, channels))
            .map_err(|e| anyhow!("Failed to reshape patch embeddings: {}", e))?
            .permuted_axes([0, 3, 1, 2])
            .as_standard_layout()
            .to_owned();

        let output = match self.config.output_mode {
            EncoderOutputMode::SpatialGrid => grid,
            EncoderOutputMode::Pooled => spatial_mean_pool(&grid.view()),
        };

        log::debug!("PatchGridEncoder forward: {:?} -> {:?}", images.shape(), output.shape());
        Ok(output)
    }
}
