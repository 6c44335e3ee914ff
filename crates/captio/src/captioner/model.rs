use std::sync::Arc;

use anyhow::anyhow;
use captio_models::{PatchGridEncoder, PrefixDecoder};
use captio_transformers::common::GenerationConfig;
use captio_transformers::decoder::{CaptionDecoder, DecoderStage, GeneratedSequence};
use captio_transformers::vision::VisionEncoder;
use ndarray::{Array2, ArrayView4};

use super::builder::CaptioningModelBuilder;
use super::config::CaptioningConfig;
use super::observations::{ObservationBuffer, StageRecorder};
use super::projector::FeatureProjector;
use crate::captio_config::CaptioConfig;
use crate::common::{format_shape, CaptionError, CaptionResult};

/// Result of one forward pass.
#[derive(Debug, Clone)]
pub struct CaptionOutput {
    /// One generated sequence per input image, in input order.
    pub sequences: Vec<GeneratedSequence>,
    /// Decoder stage outputs captured during this pass, `[batch, dim]` each.
    pub observations: ObservationBuffer,
}

impl CaptionOutput {
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Vision encoder, feature projector and caption decoder composed into an
/// image-to-token-sequence model.
///
/// Every shape contract between the three parts is checked when the model is
/// built. `forward` takes `&self` and keeps no state between calls, so one
/// model can serve concurrent callers.
///
/// # Example
///
/// ```ignore
/// use captio::CaptioningModel;
///
/// let model = CaptioningModel::builder()
///     .encoder(encoder)
///     .decoder(decoder)
///     .num_beams(5)
///     .max_output_length(50)
///     .build()?;
///
/// let output = model.forward(&images.view())?;
/// let hidden = output.observations.get_by_key("decoder_out_hidden");
/// ```
pub struct CaptioningModel {
    config: CaptioningConfig,
    encoder: Arc<dyn VisionEncoder>,
    projector: FeatureProjector,
    decoder: Arc<dyn CaptionDecoder>,
    generation: GenerationConfig,
}

impl CaptioningModel {
    pub fn builder() -> CaptioningModelBuilder {
        CaptioningModelBuilder::new()
    }

    /// Assembles a model, checking the configuration and every shape
    /// contract between the collaborators.
    pub fn new(
        encoder: Arc<dyn VisionEncoder>,
        decoder: Arc<dyn CaptionDecoder>,
        projector: FeatureProjector,
        config: CaptioningConfig,
    ) -> CaptionResult<Self> {
        config.validate()?;

        let geometry = config.feature_geometry;
        if encoder.feature_geometry() != geometry {
            return Err(CaptionError::shape(
                "encoder feature geometry",
                geometry,
                encoder.feature_geometry(),
            ));
        }
        if projector.geometry() != geometry || projector.input_len() != geometry.flat_len() {
            return Err(CaptionError::shape(
                "projector input",
                geometry.flat_len(),
                projector.input_len(),
            ));
        }
        if projector.hidden_dim() != config.hidden_dim {
            return Err(CaptionError::shape(
                "projector output",
                config.hidden_dim,
                projector.hidden_dim(),
            ));
        }
        if decoder.hidden_size() != config.hidden_dim {
            return Err(CaptionError::shape(
                "decoder hidden size",
                config.hidden_dim,
                decoder.hidden_size(),
            ));
        }
        if let Some(limit) = decoder.max_output_length() {
            if config.max_output_length > limit {
                return Err(CaptionError::InvalidConfig(format!(
                    "max_output_length {} exceeds the decoder's limit of {} tokens",
                    config.max_output_length, limit
                )));
            }
        }
        for stage in DecoderStage::ALL {
            if !decoder.observation_points().contains(&stage) {
                return Err(CaptionError::MissingObservationPoint(stage));
            }
        }

        let generation = config.generation_config();
        generation
            .validate()
            .map_err(|e| CaptionError::InvalidConfig(e.to_string()))?;

        log::info!(
            "Built CaptioningModel: {} input, {} features -> {} hidden, {} beams, max {} tokens",
            encoder.input_geometry(),
            geometry,
            config.hidden_dim,
            config.num_beams,
            config.max_output_length
        );

        Ok(Self {
            config,
            encoder,
            projector,
            decoder,
            generation,
        })
    }

    /// Builds a model from the reference collaborators described by `config`.
    pub fn from_config(config: &CaptioConfig) -> CaptionResult<Self> {
        let encoder = PatchGridEncoder::new(config.encoder.clone())
            .map_err(|e| CaptionError::InvalidConfig(format!("encoder: {}", e)))?;
        let decoder = PrefixDecoder::new(config.decoder.clone())
            .map_err(|e| CaptionError::InvalidConfig(format!("decoder: {}", e)))?;

        CaptioningModelBuilder::new()
            .config(config.model.clone())
            .encoder(encoder)
            .decoder(decoder)
            .build()
    }

    pub fn config(&self) -> &CaptioningConfig {
        &self.config
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn encoder(&self) -> &dyn VisionEncoder {
        self.encoder.as_ref()
    }

    pub fn decoder(&self) -> &dyn CaptionDecoder {
        self.decoder.as_ref()
    }

    pub fn projector(&self) -> &FeatureProjector {
        &self.projector
    }

    fn check_images(&self, images: &ArrayView4<f32>) -> CaptionResult<usize> {
        let (batch, c, h, w) = images.dim();
        let expected = self.encoder.input_geometry();
        if [c, h, w] != expected.dims() {
            return Err(CaptionError::shape(
                "image input",
                expected,
                format_shape(&[c, h, w]),
            ));
        }
        Ok(batch)
    }

    /// Runs the encoder and projector only, returning `[batch, hidden_dim]`
    /// conditioning vectors.
    pub fn encode(&self, images: &ArrayView4<f32>) -> CaptionResult<Array2<f32>> {
        let batch = self.check_images(images)?;
        if batch == 0 {
            return Ok(Array2::zeros((0, self.config.hidden_dim)));
        }
        self.encode_batch(images, batch)
    }

    fn encode_batch(&self, images: &ArrayView4<f32>, batch: usize) -> CaptionResult<Array2<f32>> {
        let grid = self.encoder.forward(images).map_err(CaptionError::Encoder)?;

        if grid.shape()[0] != batch {
            return Err(CaptionError::shape(
                "encoder output batch",
                batch,
                grid.shape()[0],
            ));
        }

        self.projector.project_grid(&grid.view())
    }

    /// Generates one token sequence per image in `[batch, 3, H, W]`, and
    /// captures the decoder's hidden state and scoring-head output.
    pub fn forward(&self, images: &ArrayView4<f32>) -> CaptionResult<CaptionOutput> {
        let batch = self.check_images(images)?;
        if batch == 0 {
            let mut observations = ObservationBuffer::new();
            observations.insert(
                DecoderStage::Transformer,
                Array2::zeros((0, self.decoder.hidden_size())),
            );
            observations.insert(
                DecoderStage::LmHead,
                Array2::zeros((0, self.decoder.vocab_size())),
            );
            return Ok(CaptionOutput {
                sequences: Vec::new(),
                observations,
            });
        }

        let conditioning = self.encode_batch(images, batch)?;

        let mut recorder = StageRecorder::new(&DecoderStage::ALL, batch);
        let sequences = self
            .decoder
            .generate(&conditioning.view(), &self.generation, &mut recorder)
            .map_err(CaptionError::Decoder)?;

        if sequences.len() != batch {
            return Err(CaptionError::Decoder(anyhow!(
                "decoder returned {} sequences for {} images",
                sequences.len(),
                batch
            )));
        }
        if let Some((index, seq)) = sequences
            .iter()
            .enumerate()
            .find(|(_, s)| s.len() > self.config.max_output_length)
        {
            return Err(CaptionError::Decoder(anyhow!(
                "decoder returned {} tokens for image {}, limit is {}",
                seq.len(),
                index,
                self.config.max_output_length
            )));
        }

        let observations = recorder.finish()?;

        log::debug!(
            "CaptioningModel forward: {} images, sequence lengths {:?}",
            batch,
            sequences.iter().map(GeneratedSequence::len).collect::<Vec<_>>()
        );

        Ok(CaptionOutput {
            sequences,
            observations,
        })
    }
}
