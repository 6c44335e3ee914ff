use captio_models::{PatchGridConfig, PrefixDecoderConfig};
use serde::{Deserialize, Serialize};

use crate::captioner::CaptioningConfig;
use crate::dataset::DatasetConfig;

/// Top-level captio configuration.
///
/// Loaded from captio.toml. Every table is optional and falls back to its
/// defaults, which describe a 224px / 768x7x7 / 768-hidden model decoding
/// with 5 beams up to 50 tokens.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CaptioConfig {
    /// Captioning model shape and decoding
    #[serde(default)]
    pub model: CaptioningConfig,

    /// Caption corpus loading
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Reference vision encoder
    #[serde(default)]
    pub encoder: PatchGridConfig,

    /// Reference caption decoder
    #[serde(default)]
    pub decoder: PrefixDecoderConfig,
}

impl CaptioConfig {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
