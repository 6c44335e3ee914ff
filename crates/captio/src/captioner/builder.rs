//! Builder pattern for CaptioningModel configuration.

use std::sync::Arc;

use captio_transformers::decoder::CaptionDecoder;
use captio_transformers::vision::{FeatureGeometry, VisionEncoder};

use super::config::CaptioningConfig;
use super::model::CaptioningModel;
use super::projector::FeatureProjector;
use crate::common::{CaptionError, CaptionResult};

/// Builder for configuring a CaptioningModel instance.
///
/// Unset values fall back to [`CaptioningConfig::default`]. Without an
/// explicit projector, one is initialised from `projector_seed` to map the
/// configured feature geometry onto `hidden_dim`.
///
/// # Example
///
/// ```ignore
/// let model = CaptioningModel::builder()
///     .encoder(PatchGridEncoder::new(PatchGridConfig::default())?)
///     .decoder(PrefixDecoder::new(PrefixDecoderConfig::default())?)
///     .num_beams(3)
///     .build()?;
/// ```
#[derive(Default)]
pub struct CaptioningModelBuilder {
    config: CaptioningConfig,
    encoder: Option<Arc<dyn VisionEncoder>>,
    decoder: Option<Arc<dyn CaptionDecoder>>,
    projector: Option<FeatureProjector>,
}

impl CaptioningModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every configuration value at once.
    pub fn config(mut self, config: CaptioningConfig) -> Self {
        self.config = config;
        self
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    pub fn encoder(self, encoder: impl VisionEncoder + 'static) -> Self {
        self.shared_encoder(Arc::new(encoder))
    }

    pub fn shared_encoder(mut self, encoder: Arc<dyn VisionEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn decoder(self, decoder: impl CaptionDecoder + 'static) -> Self {
        self.shared_decoder(Arc::new(decoder))
    }

    pub fn shared_decoder(mut self, decoder: Arc<dyn CaptionDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Uses a pre-built projector instead of a seeded one.
    pub fn projector(mut self, projector: FeatureProjector) -> Self {
        self.projector = Some(projector);
        self
    }

    // =========================================================================
    // Model Shape
    // =========================================================================

    pub fn hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.config.hidden_dim = hidden_dim;
        self
    }

    pub fn feature_geometry(mut self, geometry: FeatureGeometry) -> Self {
        self.config.feature_geometry = geometry;
        self
    }

    pub fn projector_seed(mut self, seed: u64) -> Self {
        self.config.projector_seed = seed;
        self
    }

    // =========================================================================
    // Generation
    // =========================================================================

    pub fn max_output_length(mut self, max_output_length: usize) -> Self {
        self.config.max_output_length = max_output_length;
        self
    }

    pub fn min_output_length(mut self, min_output_length: usize) -> Self {
        self.config.min_output_length = min_output_length;
        self
    }

    pub fn num_beams(mut self, num_beams: usize) -> Self {
        self.config.num_beams = num_beams;
        self
    }

    /// Decode greedily (a single beam).
    pub fn greedy(self) -> Self {
        self.num_beams(1)
    }

    pub fn length_penalty(mut self, length_penalty: f32) -> Self {
        self.config.length_penalty = length_penalty;
        self
    }

    pub fn early_stopping(mut self, early_stopping: bool) -> Self {
        self.config.early_stopping = early_stopping;
        self
    }

    pub fn build(self) -> CaptionResult<CaptioningModel> {
        self.config.validate()?;

        let encoder = self
            .encoder
            .ok_or_else(|| CaptionError::InvalidConfig("no vision encoder set".to_string()))?;
        let decoder = self
            .decoder
            .ok_or_else(|| CaptionError::InvalidConfig("no caption decoder set".to_string()))?;

        let projector = match self.projector {
            Some(projector) => projector,
            None => FeatureProjector::new(
                self.config.feature_geometry,
                self.config.hidden_dim,
                self.config.projector_seed,
            )?,
        };

        CaptioningModel::new(encoder, decoder, projector, self.config)
    }
}
