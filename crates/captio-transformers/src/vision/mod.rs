//! Vision encoder contract.
//!
//! A captioning model treats its vision backbone as a black box that maps a
//! batch of images to a feature grid of a statically known geometry. The
//! types here describe that geometry so it can be checked when the model is
//! assembled instead of being discovered at the first forward call.

mod traits;

pub use traits::{EncoderOutputMode, FeatureGeometry, ImageGeometry, VisionEncoder};
