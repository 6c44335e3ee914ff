use captio_transformers::common::{BeamSearchParams, DecodingStrategy, GenerationConfig};
use captio_transformers::vision::FeatureGeometry;
use serde::{Deserialize, Serialize};

use crate::common::{CaptionError, CaptionResult};

/// Construction parameters of a [`CaptioningModel`](super::CaptioningModel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptioningConfig {
    /// Width of the conditioning vector fed to the decoder.
    pub hidden_dim: usize,
    /// Upper bound on generated tokens per image.
    pub max_output_length: usize,
    /// Beam width. 1 decodes greedily.
    pub num_beams: usize,
    pub length_penalty: f32,
    pub early_stopping: bool,
    /// Minimum generated tokens before EOS is allowed.
    pub min_output_length: usize,
    /// Per-image shape the encoder must produce.
    pub feature_geometry: FeatureGeometry,
    /// Seed for a projector the model initialises itself.
    pub projector_seed: u64,
}

impl Default for CaptioningConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 768,
            max_output_length: 50,
            num_beams: 5,
            length_penalty: 1.0,
            early_stopping: true,
            min_output_length: 0,
            feature_geometry: FeatureGeometry::default(),
            projector_seed: 0,
        }
    }
}

impl CaptioningConfig {
    pub fn validate(&self) -> CaptionResult<()> {
        let positive = [
            ("hidden_dim", self.hidden_dim),
            ("max_output_length", self.max_output_length),
            ("num_beams", self.num_beams),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(CaptionError::InvalidConfig(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if self.feature_geometry.is_empty() {
            return Err(CaptionError::InvalidConfig(format!(
                "feature_geometry must be non-empty, got {}",
                self.feature_geometry
            )));
        }
        if self.min_output_length > self.max_output_length {
            return Err(CaptionError::InvalidConfig(format!(
                "min_output_length ({}) exceeds max_output_length ({})",
                self.min_output_length, self.max_output_length
            )));
        }
        if !self.length_penalty.is_finite() {
            return Err(CaptionError::InvalidConfig(format!(
                "length_penalty must be finite, got {}",
                self.length_penalty
            )));
        }
        Ok(())
    }

    /// The decoding settings handed to the decoder on every forward pass.
    pub fn generation_config(&self) -> GenerationConfig {
        let strategy = if self.num_beams == 1 {
            DecodingStrategy::Greedy
        } else {
            DecodingStrategy::BeamSearch(BeamSearchParams {
                num_beams: self.num_beams,
                length_penalty: self.length_penalty,
                early_stopping: self.early_stopping,
            })
        };
        GenerationConfig {
            max_length: self.max_output_length,
            min_length: self.min_output_length,
            strategy,
        }
    }
}
