pub mod sampling;

pub use sampling::*;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Parameters for beam search decoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamSearchParams {
    pub num_beams: usize,
    pub length_penalty: f32,
    pub early_stopping: bool,
}

impl Default for BeamSearchParams {
    fn default() -> Self {
        Self {
            num_beams: 5,
            length_penalty: 1.0,
            early_stopping: true,
        }
    }
}

/// The decoding algorithm and its specific parameters.
///
/// Sampling strategies are intentionally absent: captioning runs deterministic
/// decoding so repeated calls reproduce the same captions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodingStrategy {
    /// Select the most likely token (argmax).
    Greedy,
    /// Explore multiple hypotheses to find the most likely sequence.
    BeamSearch(BeamSearchParams),
}

impl DecodingStrategy {
    pub fn num_beams(&self) -> usize {
        match self {
            DecodingStrategy::Greedy => 1,
            DecodingStrategy::BeamSearch(params) => params.num_beams,
        }
    }
}

/// Generation settings handed to a caption decoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of generated tokens, the start token excluded.
    pub max_length: usize,
    /// Minimum number of generated tokens before EOS may be chosen.
    pub min_length: usize,
    pub strategy: DecodingStrategy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 50,
            min_length: 0,
            strategy: DecodingStrategy::BeamSearch(BeamSearchParams::default()),
        }
    }
}

impl GenerationConfig {
    pub fn beam_search(max_length: usize, num_beams: usize) -> Self {
        Self {
            max_length,
            strategy: DecodingStrategy::BeamSearch(BeamSearchParams {
                num_beams,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn greedy(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: 0,
            strategy: DecodingStrategy::Greedy,
        }
    }

    pub fn num_beams(&self) -> usize {
        self.strategy.num_beams()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            bail!("max_length must be positive");
        }
        if self.min_length > self.max_length {
            bail!(
                "min_length ({}) exceeds max_length ({})",
                self.min_length,
                self.max_length
            );
        }
        if let DecodingStrategy::BeamSearch(params) = &self.strategy {
            if params.num_beams == 0 {
                bail!("num_beams must be positive");
            }
            if !params.length_penalty.is_finite() {
                bail!("length_penalty must be finite");
            }
        }
        Ok(())
    }
}
