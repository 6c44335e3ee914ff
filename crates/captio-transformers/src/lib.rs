//! Core building blocks for image captioning models.
//!
//! This crate provides the tensor layers, generation configuration and the
//! collaborator traits (`VisionEncoder`, `CaptionDecoder`) that a captioning
//! model composes, without any model-specific implementation.

pub mod activations;
pub mod common;
pub mod decoder;
pub mod linear_layer;
pub mod normalization;
pub mod pooling;
pub mod utils;
pub mod vision;

// Re-export commonly used items
pub use crate::{
    common::{BeamSearchParams, DecodingStrategy, GenerationConfig},
    decoder::{
        run_beam_search, BeamHypothesis, BeamStepper, CaptionDecoder, DecoderStage,
        GeneratedSequence, NoopObserver, StageObserver,
    },
    linear_layer::LinearLayer,
    normalization::LayerNorm,
    pooling::spatial_mean_pool,
    vision::{EncoderOutputMode, FeatureGeometry, ImageGeometry, VisionEncoder},
};

// Prelude for easy imports
pub mod prelude {
    pub use crate::common::GenerationConfig;
    pub use crate::decoder::{CaptionDecoder, DecoderStage, StageObserver};
    pub use crate::vision::{FeatureGeometry, ImageGeometry, VisionEncoder};
}
