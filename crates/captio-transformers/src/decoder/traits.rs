use std::fmt;

use anyhow::Result;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::common::GenerationConfig;

/// A named point inside a decoder whose output can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderStage {
    /// Final hidden state of the decoder stack, before the scoring head.
    Transformer,
    /// Output of the scoring head (pre-softmax logits over the vocabulary).
    LmHead,
}

impl DecoderStage {
    /// Every stage, in the order a decoder step produces them.
    pub const ALL: [DecoderStage; 2] = [DecoderStage::Transformer, DecoderStage::LmHead];

    /// Stable key used when the stage is stored or reported.
    pub fn key(&self) -> &'static str {
        match self {
            DecoderStage::Transformer => "decoder_out_hidden",
            DecoderStage::LmHead => "decoder_out_head",
        }
    }
}

impl fmt::Display for DecoderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Receives decoder stage outputs as they are produced.
///
/// `sample` is the row of the conditioning batch being decoded. `output` is
/// `[rows, dim]`, one row per live beam hypothesis, best-ranked first.
/// Observers only read; they cannot influence generation.
pub trait StageObserver {
    fn observe(&mut self, sample: usize, stage: DecoderStage, output: ArrayView2<'_, f32>);
}

/// Discards every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn observe(&mut self, _sample: usize, _stage: DecoderStage, _output: ArrayView2<'_, f32>) {}
}

/// One generated caption as token ids.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSequence {
    /// Generated tokens, without the start token or a trailing EOS.
    pub tokens: Vec<u32>,
    /// Length-normalised log-probability of the sequence.
    pub score: f32,
}

impl GeneratedSequence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A pretrained sequence-generation decoder driven by conditioning vectors.
pub trait CaptionDecoder: Send + Sync {
    /// Width of the conditioning vector the decoder expects.
    fn hidden_size(&self) -> usize;

    fn vocab_size(&self) -> usize;

    /// Stages this decoder reports to a `StageObserver`.
    fn observation_points(&self) -> &[DecoderStage];

    /// Longest sequence the decoder can produce, if it has a fixed limit.
    fn max_output_length(&self) -> Option<usize> {
        None
    }

    /// Generates one sequence per row of `conditioning` (`[batch, hidden]`).
    fn generate(
        &self,
        conditioning: &ArrayView2<f32>,
        config: &GenerationConfig,
        observer: &mut dyn StageObserver,
    ) -> Result<Vec<GeneratedSequence>>;
}
