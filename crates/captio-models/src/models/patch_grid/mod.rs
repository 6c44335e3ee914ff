//! Patch-embedding vision backbone.
//!
//! Splits each image into non-overlapping square patches and embeds every
//! patch into a channel vector, giving a `[channels, grid, grid]` feature
//! grid per image. With the default configuration (224px images, 32px
//! patches, 768 channels) the grid is 768x7x7.

mod config;
mod model;

#[cfg(test)]
mod tests;

pub use config::PatchGridConfig;
pub use model::PatchGridEncoder;
