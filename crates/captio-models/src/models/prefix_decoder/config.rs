use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefixDecoderConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,   // conditioning width
    pub max_positions: usize, // longest sequence the position table covers
    pub bos_token_id: u32,
    pub eos_token_id: u32,
    pub seed: u64,
    pub layer_norm_eps: f32,
}

impl Default for PrefixDecoderConfig {
    fn default() -> Self {
        Self {
            vocab_size: 1024,
            hidden_size: 768,
            max_positions: 64,
            bos_token_id: 0,
            eos_token_id: 1,
            seed: 0,
            layer_norm_eps: 1e-5,
        }
    }
}

impl PrefixDecoderConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vocab_size < 2 {
            bail!("vocab_size must be at least 2, got {}", self.vocab_size);
        }
        if self.hidden_size == 0 || self.max_positions == 0 {
            bail!(
                "hidden_size and max_positions must be positive (got {}, {})",
                self.hidden_size,
                self.max_positions
            );
        }
        for (name, id) in [("bos_token_id", self.bos_token_id), ("eos_token_id", self.eos_token_id)] {
            if id as usize >= self.vocab_size {
                bail!("{} {} is outside the vocabulary of size {}", name, id, self.vocab_size);
            }
        }
        if self.bos_token_id == self.eos_token_id {
            bail!("bos_token_id and eos_token_id must differ (both {})", self.bos_token_id);
        }
        if !(self.layer_norm_eps > 0.0) {
            bail!("layer_norm_eps must be positive, got {}", self.layer_norm_eps);
        }
        Ok(())
    }
}
