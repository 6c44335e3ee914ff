//! Image captioning by composing a pretrained vision encoder with a caption
//! decoder.
//!
//! # Overview
//!
//! - [`CaptioningModel`]: encoder, [`FeatureProjector`] and decoder wired
//!   together, generating one token sequence per image and capturing the
//!   decoder's hidden state and scoring-head output on the way
//! - [`CocoCaptions`]: COCO-style image/caption corpus
//! - [`CaptioConfig`]: TOML configuration for the model and the corpus
//!
//! # Example
//!
//! ```ignore
//! use captio::{images_to_batch, load_config, CaptioningModel, CocoCaptions, Split};
//!
//! let config = load_config()?;
//! let model = CaptioningModel::from_config(&config)?;
//! let corpus = CocoCaptions::open_split("./data/coco", Split::Validation, config.dataset.clone())?;
//!
//! let sample = corpus.get(0)?;
//! let batch = images_to_batch(&[sample.image])?;
//! let output = model.forward(&batch.view())?;
//! println!("{:?}", output.sequences[0].tokens);
//! ```
//!
//! # See Also
//!
//! - [`captio_transformers`]: building blocks and collaborator traits
//! - [`captio_models`]: reference encoder and decoder

pub mod captio_config;
pub mod captio_config_loader;
pub mod captioner;
pub mod common;
pub mod dataset;

pub use captio_config::CaptioConfig;
pub use captio_config_loader::{load_config, load_config_from_path};
pub use captioner::{
    CaptionOutput, CaptioningConfig, CaptioningModel, CaptioningModelBuilder, FeatureProjector,
    ObservationBuffer,
};
pub use common::{CaptionError, CaptionResult};
pub use dataset::{images_to_batch, CaptionSample, CocoCaptions, DatasetConfig, ImageSize, SampleImage, Split};

// Collaborator contracts, re-exported for implementors
pub use captio_transformers::{
    CaptionDecoder, DecoderStage, EncoderOutputMode, FeatureGeometry, GeneratedSequence,
    ImageGeometry, StageObserver, VisionEncoder,
};
