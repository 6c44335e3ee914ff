//! COCO-style caption corpora.
//!
//! [`CocoCaptions`] pairs each image in a directory with the captions an
//! annotation index lists for it. Images are decoded lazily and can be
//! handed back as decoded RGB images or as `[3, H, W]` tensors ready for
//! [`images_to_batch`].

mod coco;
mod pixels;


pub use coco::{CaptionSample, CocoCaptions, Split};
pub use pixels::{images_to_batch, rgb_to_tensor, DatasetConfig, ImageSize, SampleImage};
