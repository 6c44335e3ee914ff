//! Image decoding and pixel-to-tensor conversion for corpus samples.

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array3, Array4, Axis};
use serde::{Deserialize, Serialize};

use crate::common::{format_shape, CaptionError, CaptionResult};

/// Target size for optional resizing, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

/// Dataset loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Return `[3, H, W]` u8 tensors instead of decoded images.
    pub apply_pixel_to_tensor_conversion: bool,
    /// Resize every image (bilinear) before conversion. None keeps the file's size.
    pub resize: Option<ImageSize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            apply_pixel_to_tensor_conversion: true,
            resize: None,
        }
    }
}

impl DatasetConfig {
    /// Decoded images, untouched.
    pub fn raw() -> Self {
        Self {
            apply_pixel_to_tensor_conversion: false,
            resize: None,
        }
    }

    /// Tensors resized to a square encoder input.
    pub fn for_encoder(side: u32) -> Self {
        Self {
            apply_pixel_to_tensor_conversion: true,
            resize: Some(ImageSize::square(side)),
        }
    }
}

/// Pixels of one corpus image.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleImage {
    /// The decoded RGB image, no conversion applied.
    Raw(RgbImage),
    /// `[channels, height, width]` with the original 0..=255 values.
    Tensor(Array3<u8>),
}

impl SampleImage {
    /// `[channels, height, width]`.
    pub fn dims(&self) -> [usize; 3] {
        match self {
            SampleImage::Raw(img) => [3, img.height() as usize, img.width() as usize],
            SampleImage::Tensor(t) => {
                let (c, h, w) = t.dim();
                [c, h, w]
            }
        }
    }

    pub fn as_raw(&self) -> Option<&RgbImage> {
        match self {
            SampleImage::Raw(img) => Some(img),
            SampleImage::Tensor(_) => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Array3<u8>> {
        match self {
            SampleImage::Tensor(t) => Some(t),
            SampleImage::Raw(_) => None,
        }
    }
}

/// Converts an RGB image to a `[3, H, W]` tensor, values unchanged.
pub fn rgb_to_tensor(img: &RgbImage) -> Array3<u8> {
    let (width, height) = img.dimensions();
    Array3::from_shape_fn((3, height as usize, width as usize), |(c, y, x)| {
        img.get_pixel(x as u32, y as u32)[c]
    })
}

/// Decodes the file at `path` and applies `config`.
pub(crate) fn load_sample_image(path: &Path, config: &DatasetConfig) -> CaptionResult<SampleImage> {
    let decoded = image::open(path).map_err(|source| CaptionError::Image {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = match config.resize {
        Some(size) => decoded.resize_exact(size.width, size.height, FilterType::Triangle),
        None => decoded,
    };
    let rgb = decoded.to_rgb8();

    if config.apply_pixel_to_tensor_conversion {
        Ok(SampleImage::Tensor(rgb_to_tensor(&rgb)))
    } else {
        Ok(SampleImage::Raw(rgb))
    }
}

/// Stacks tensor samples into a `[batch, 3, H, W]` model input scaled to `[0, 1]`.
///
/// Every sample must be a tensor and all must share one shape. An empty slice
/// gives an empty batch of zero spatial size.
pub fn images_to_batch(images: &[SampleImage]) -> CaptionResult<Array4<f32>> {
    let Some(first) = images.first() else {
        return Ok(Array4::zeros((0, 3, 0, 0)));
    };
    let dims = first.dims();

    let mut views = Vec::with_capacity(images.len());
    for (index, sample) in images.iter().enumerate() {
        let tensor = sample.as_tensor().ok_or_else(|| {
            CaptionError::InvalidConfig(format!(
                "image {} is not a tensor; enable apply_pixel_to_tensor_conversion",
                index
            ))
        })?;
        if sample.dims() != dims {
            return Err(CaptionError::shape(
                "batch image",
                format_shape(&dims),
                format_shape(&sample.dims()),
            ));
        }
        views.push(tensor.view());
    }

    let stacked = ndarray::stack(Axis(0), &views)
        .map_err(|e| CaptionError::InvalidConfig(format!("cannot stack images: {}", e)))?;
    Ok(stacked.mapv(|v| v as f32 / 255.0))
}
