//! Common types shared across captio modules.

mod error;

pub use error::{CaptionError, CaptionResult};
pub(crate) use error::format_shape;
