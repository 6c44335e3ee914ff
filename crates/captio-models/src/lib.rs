//! Reference collaborators for captio.
//!
//! This crate provides small, self-contained implementations of the
//! `VisionEncoder` and `CaptionDecoder` traits from `captio-transformers`:
//!
//! - [`PatchGridEncoder`]: patch-embedding backbone producing a feature grid
//! - [`PrefixDecoder`]: conditioning-prefixed decoder with a tied scoring head
//!
//! Weights are initialised from a seed, so two models built from the same
//! configuration behave identically. They are meant for wiring, testing and
//! benchmarking a captioning pipeline, not for producing meaningful captions.
//!
//! # Example
//!
//! ```ignore
//! use captio_models::{PatchGridConfig, PatchGridEncoder};
//! use captio_transformers::VisionEncoder;
//!
//! let encoder = PatchGridEncoder::new(PatchGridConfig::default())?;
//! assert_eq!(encoder.feature_geometry().flat_len(), 37632);
//! ```

pub mod models;

pub use models::patch_grid::{PatchGridConfig, PatchGridEncoder};
pub use models::prefix_decoder::{PrefixDecoder, PrefixDecoderConfig};
