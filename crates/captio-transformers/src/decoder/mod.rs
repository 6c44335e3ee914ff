//! Caption decoder contract and the shared beam search.
//!
//! A decoder consumes one conditioning vector per image and generates a token
//! sequence for each. Intermediate outputs are reported through an explicit
//! `StageObserver` passed to `generate`, at the moment each stage produces
//! them, so callers can capture decoder internals without the decoder
//! exposing its layers.

mod beams;
mod traits;

pub use beams::{run_beam_search, BeamHypothesis, BeamStepper};
pub use traits::{CaptionDecoder, DecoderStage, GeneratedSequence, NoopObserver, StageObserver};
