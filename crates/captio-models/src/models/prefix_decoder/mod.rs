//! Conditioning-prefixed caption decoder.
//!
//! Every generation step mixes the conditioning vector with the embedding of
//! the last token and its position, normalises the result, and scores the
//! vocabulary with a head tied to the token embedding. Both the hidden state
//! and the logits are reported to the caller's `StageObserver`.

mod config;
mod model;

#[cfg(test)]
mod tests;

pub use config::PrefixDecoderConfig;
pub use model::PrefixDecoder;
