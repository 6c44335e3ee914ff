//! Image captioning by encoder/decoder composition.
//!
//! A [`CaptioningModel`] runs a vision encoder over a batch of images,
//! flattens each feature grid, projects it to the decoder's width with a
//! [`FeatureProjector`], and lets the caption decoder generate one token
//! sequence per image. While decoding, the model captures the decoder's
//! final hidden state and scoring-head output and returns them alongside
//! the sequences in an [`ObservationBuffer`].

mod builder;
mod config;
mod model;
mod observations;
mod projector;


pub use builder::CaptioningModelBuilder;
pub use config::CaptioningConfig;
pub use model::{CaptionOutput, CaptioningModel};
pub use observations::ObservationBuffer;
pub use projector::FeatureProjector;
