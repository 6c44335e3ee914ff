//! Learned affine map from flattened encoder features to the decoder width.

use captio_transformers::linear_layer::LinearLayer;
use captio_transformers::utils::flatten_trailing;
use captio_transformers::utils::init::seeded_rng;
use captio_transformers::vision::FeatureGeometry;
use ndarray::{Array1, Array2, ArrayView2, ArrayView4};

use crate::common::{format_shape, CaptionError, CaptionResult};

const INIT_STD: f32 = 0.02;

/// Projects a flattened `[channels, height, width]` feature grid of length
/// `L` onto `H` conditioning features.
///
/// The input length is fixed at construction from a [`FeatureGeometry`],
/// so a mismatched encoder is caught before any data flows.
#[derive(Debug, Clone)]
pub struct FeatureProjector {
    geometry: FeatureGeometry,
    linear: LinearLayer, // [H, L]
}

impl FeatureProjector {
    /// Seeded initialisation: weights ~ N(0, 0.02), zero bias.
    pub fn new(geometry: FeatureGeometry, hidden_dim: usize, seed: u64) -> CaptionResult<Self> {
        if geometry.is_empty() || hidden_dim == 0 {
            return Err(CaptionError::InvalidConfig(format!(
                "projector needs a non-empty geometry and hidden_dim, got {} -> {}",
                geometry, hidden_dim
            )));
        }
        let mut rng = seeded_rng(seed);
        let linear = LinearLayer::random(hidden_dim, geometry.flat_len(), INIT_STD, true, &mut rng)
            .map_err(|e| CaptionError::InvalidConfig(e.to_string()))?;
        Ok(Self { geometry, linear })
    }

    /// Uses existing weights, `weight` laid out `[hidden_dim, geometry.flat_len()]`.
    pub fn from_weights(
        geometry: FeatureGeometry,
        weight: Array2<f32>,
        bias: Array1<f32>,
    ) -> CaptionResult<Self> {
        if weight.ncols() != geometry.flat_len() {
            return Err(CaptionError::InvalidConfig(format!(
                "projector weight has {} input columns but geometry {} flattens to {}",
                weight.ncols(),
                geometry,
                geometry.flat_len()
            )));
        }
        if weight.nrows() == 0 {
            return Err(CaptionError::InvalidConfig(
                "projector weight has no output rows".to_string(),
            ));
        }
        let linear = LinearLayer::try_new_f32(weight, bias)
            .map_err(|e| CaptionError::InvalidConfig(e.to_string()))?;
        Ok(Self { geometry, linear })
    }

    pub fn geometry(&self) -> FeatureGeometry {
        self.geometry
    }

    pub fn input_len(&self) -> usize {
        self.linear.in_features()
    }

    pub fn hidden_dim(&self) -> usize {
        self.linear.out_features()
    }

    pub fn weight(&self) -> &Array2<f32> {
        self.linear.weight()
    }

    /// `[batch, L]` to `[batch, H]`.
    pub fn forward(&self, flat: &ArrayView2<f32>) -> CaptionResult<Array2<f32>> {
        if flat.ncols() != self.input_len() {
            return Err(CaptionError::shape(
                "projector input",
                self.input_len(),
                flat.ncols(),
            ));
        }
        Ok(self.linear.matmul(flat))
    }

    /// Flattens `[batch, C, H, W]` row-major over `C, H, W`, then projects.
    pub fn project_grid(&self, grid: &ArrayView4<f32>) -> CaptionResult<Array2<f32>> {
        let (_, c, h, w) = grid.dim();
        if [c, h, w] != self.geometry.dims() {
            return Err(CaptionError::shape(
                "encoder feature grid",
                self.geometry,
                format_shape(&[c, h, w]),
            ));
        }
        let flat = flatten_trailing(grid).map_err(CaptionError::Encoder)?;
        self.forward(&flat.view())
    }
}
