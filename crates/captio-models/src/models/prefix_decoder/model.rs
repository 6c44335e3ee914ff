use anyhow::{bail, Result};
use captio_transformers::activations::gelu_inplace;
use captio_transformers::common::GenerationConfig;
use captio_transformers::decoder::{
    run_beam_search, BeamStepper, CaptionDecoder, DecoderStage, GeneratedSequence, StageObserver,
};
use captio_transformers::linear_layer::LinearLayer;
use captio_transformers::normalization::LayerNorm;
use captio_transformers::utils::init::{normal_array2, seeded_rng};
use ndarray::{Array2, ArrayView1, ArrayView2};

use super::config::PrefixDecoderConfig;

const INIT_STD: f32 = 0.02;

pub struct PrefixDecoder {
    config: PrefixDecoderConfig,
    token_embedding: Array2<f32>,    // [vocab, hidden]
    position_embedding: Array2<f32>, // [max_positions, hidden]
    norm: LayerNorm,
    lm_head: LinearLayer, // tied to token_embedding
}

impl PrefixDecoder {
    pub fn new(config: PrefixDecoderConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = seeded_rng(config.seed);
        let token_embedding =
            normal_array2((config.vocab_size, config.hidden_size), INIT_STD, &mut rng)?;
        let position_embedding =
            normal_array2((config.max_positions, config.hidden_size), INIT_STD, &mut rng)?;
        let norm = LayerNorm::identity(config.hidden_size, config.layer_norm_eps);
        let lm_head = LinearLayer::new_f32(token_embedding.clone(), None);

        log::info!(
            "Built PrefixDecoder: vocab {}, hidden {}, {} positions",
            config.vocab_size,
            config.hidden_size,
            config.max_positions
        );

        Ok(Self {
            config,
            token_embedding,
            position_embedding,
            norm,
            lm_head,
        })
    }

    pub fn config(&self) -> &PrefixDecoderConfig {
        &self.config
    }

    pub fn lm_head(&self) -> &LinearLayer {
        &self.lm_head
    }

    /// `LayerNorm(GELU(cond + tok[last] + pos[step]))` for every history.
    fn hidden_states(
        &self,
        conditioning: &ArrayView1<f32>,
        histories: &[&[u32]],
        step: usize,
    ) -> Result<Array2<f32>> {
        let position = self.position_embedding.row(step);
        let mut hidden = Array2::<f32>::zeros((histories.len(), self.config.hidden_size));

        for (mut row, history) in hidden.rows_mut().into_iter().zip(histories) {
            let last = match history.last() {
                Some(&token) if (token as usize) < self.config.vocab_size => token as usize,
                Some(&token) => bail!("Token {} is outside the vocabulary", token),
                None => bail!("Empty token history at step {}", step),
            };
            row.assign(conditioning);
            row += &self.token_embedding.row(last);
            row += &position;
        }

        gelu_inplace(&mut hidden);
        self.norm.forward_2d(&hidden.view())
    }
}

/// Drives one conditioning row through the shared beam search.
struct PrefixStepper<'a, 'o> {
    decoder: &'a PrefixDecoder,
    conditioning: ArrayView1<'a, f32>,
    sample: usize,
    observer: &'o mut dyn StageObserver,
}

impl BeamStepper for PrefixStepper<'_, '_> {
    fn start_token_id(&self) -> u32 {
        self.decoder.config.bos_token_id
    }

    fn eos_token_id(&self) -> u32 {
        self.decoder.config.eos_token_id
    }

    fn step(&mut self, histories: &[&[u32]], step: usize) -> Result<Array2<f32>> {
        let hidden = self
            .decoder
            .hidden_states(&self.conditioning, histories, step)?;
        self.observer
            .observe(self.sample, DecoderStage::Transformer, hidden.view());

        let logits = self.decoder.lm_head.try_matmul(&hidden.view())?;
        self.observer
            .observe(self.sample, DecoderStage::LmHead, logits.view());

        Ok(logits)
    }
}

impl CaptionDecoder for PrefixDecoder {
    fn hidden_size(&self) -> usize {
        self.config.hidden_size
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn observation_points(&self) -> &[DecoderStage] {
        &DecoderStage::ALL
    }

    fn max_output_length(&self) -> Option<usize> {
        Some(self.config.max_positions)
    }

    fn generate(
        &self,
        conditioning: &ArrayView2<f32>,
        config: &GenerationConfig,
        observer: &mut dyn StageObserver,
    ) -> Result<Vec<GeneratedSequence>> {
        if conditioning.ncols() != self.config.hidden_size {
            bail!(
                "PrefixDecoder expects conditioning of width {}, got {}",
                self.config.hidden_size,
                conditioning.ncols()
            );
        }
        if config.max_length > self.config.max_positions {
            bail!(
                "max_length {} exceeds the decoder's {} positions",
                config.max_length,
                self.config.max_positions
            );
        }

        let mut sequences = Vec::with_capacity(conditioning.nrows());
        for (sample, row) in conditioning.rows().into_iter().enumerate() {
            let mut stepper = PrefixStepper {
                decoder: self,
                conditioning: row,
                sample,
                observer: &mut *observer,
            };
            let sequence = run_beam_search(&mut stepper, config)?;
            log::debug!(
                "PrefixDecoder sample {}: {} tokens, score {:.4}",
                sample,
                sequence.len(),
                sequence.score
            );
            sequences.push(sequence);
        }

        Ok(sequences)
    }
}
