//! The value carried through a dynamically built transform sequence.
//!
//! Primitives in a sequence disagree about representation: crops and flips
//! work on 8-bit images, masking and normalization on float arrays, and the
//! sequence must end in a dense tensor. `Frame` carries whichever one the
//! previous step produced.
//!
//! ```text
//! Image ──(erasing/cutout/normalize)──► Array ──(to-tensor)──► Tensor
//!   ▲                                     │
//!   └──────────────(to-image)─────────────┘
//! ```
//!
//! Arrays are channel-first `[C, H, W]` float tensors holding pixel-domain
//! values (0..=255) until a normalization step rescales them.

use crate::error::{PipelineError, PipelineResult};
use anyhow::Result;
use image::{DynamicImage, GrayImage, RgbImage};
use tch::{Kind, Tensor};

#[derive(Debug)]
pub enum Frame {
    /// 8-bit image.
    Image(DynamicImage),
    /// Float array, `[C, H, W]`.
    Array(Tensor),
    /// Dense output tensor.
    Tensor(Tensor),
    /// Two views of one item, produced by dual-cutout.
    Pair(Box<Frame>, Box<Frame>),
}

impl Frame {
    pub fn pair(first: Frame, second: Frame) -> Self {
        Frame::Pair(Box::new(first), Box::new(second))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Frame::Image(_) => "image",
            Frame::Array(_) => "array",
            Frame::Tensor(_) => "tensor",
            Frame::Pair(..) => "pair",
        }
    }

    /// Applies `f` to a single frame, or to both halves of a pair.
    pub fn map<F>(self, mut f: F) -> Result<Frame>
    where
        F: FnMut(Frame) -> Result<Frame>,
    {
        match self {
            Frame::Pair(first, second) => {
                let first = f(*first)?;
                let second = f(*second)?;
                Ok(Frame::pair(first, second))
            }
            single => f(single),
        }
    }

    /// Views a single frame as a float array, converting images on the way.
    /// Pairs are rejected; callers go through [`Frame::map`] first.
    pub fn into_array(self, primitive: &'static str) -> PipelineResult<Tensor> {
        match self {
            Frame::Image(img) => image_to_array(&img),
            Frame::Array(t) | Frame::Tensor(t) => Ok(t.to_kind(Kind::Float)),
            Frame::Pair(..) => Err(PipelineError::runtime(
                primitive,
                "cannot be applied to an image pair",
            )),
        }
    }

    /// Extracts the output tensor of a single-view sequence.
    pub fn into_tensor(self) -> PipelineResult<Tensor> {
        match self {
            Frame::Tensor(t) => Ok(t),
            other => Err(PipelineError::runtime(
                "output",
                format!("expected a tensor, got {}", other.kind_name()),
            )),
        }
    }

    /// Extracts one or two output tensors.
    pub fn into_tensors(self) -> PipelineResult<Vec<Tensor>> {
        match self {
            Frame::Pair(first, second) => {
                let mut tensors = first.into_tensors()?;
                tensors.extend(second.into_tensors()?);
                Ok(tensors)
            }
            single => Ok(vec![single.into_tensor()?]),
        }
    }
}

impl From<DynamicImage> for Frame {
    fn from(img: DynamicImage) -> Self {
        Frame::Image(img)
    }
}

/// Converts an 8-bit image to a `[C, H, W]` float array without rescaling.
///
/// | Input     | Channels |
/// |-----------|----------|
/// | Luma8     | 1        |
/// | Rgba8     | 4        |
/// | otherwise | 3 (RGB)  |
pub fn image_to_array(img: &DynamicImage) -> PipelineResult<Tensor> {
    let (width, height) = (img.width() as i64, img.height() as i64);
    if width == 0 || height == 0 {
        return Err(PipelineError::runtime(
            "image conversion",
            format!("image dimensions must be positive (got {}x{})", width, height),
        ));
    }

    let (raw, channels): (&[u8], i64) = match img {
        DynamicImage::ImageLuma8(buf) => (buf.as_raw(), 1),
        DynamicImage::ImageRgb8(buf) => (buf.as_raw(), 3),
        DynamicImage::ImageRgba8(buf) => (buf.as_raw(), 4),
        other => {
            let rgb = other.to_rgb8();
            return Ok(hwc_to_chw(rgb.as_raw(), height, width, 3));
        }
    };
    Ok(hwc_to_chw(raw, height, width, channels))
}

fn hwc_to_chw(raw: &[u8], height: i64, width: i64, channels: i64) -> Tensor {
    Tensor::from_slice(raw)
        .reshape([height, width, channels])
        .permute([2, 0, 1])
        .to_kind(Kind::Float)
        .contiguous()
}

/// Converts a `[C, H, W]` (or `[H, W]`) pixel-domain array back into an
/// 8-bit image, clamping to 0..=255. Supports 1 and 3 channels.
pub fn array_to_image(array: &Tensor) -> PipelineResult<DynamicImage> {
    let array = match array.dim() {
        2 => array.unsqueeze(0),
        3 => array.shallow_clone(),
        d => {
            return Err(PipelineError::runtime(
                "to-image",
                format!("expected a [C, H, W] array, got {} dims", d),
            ))
        }
    };
    let size = array.size();
    let (channels, height, width) = (size[0], size[1] as u32, size[2] as u32);

    let hwc = array
        .to_kind(Kind::Float)
        .clamp(0.0, 255.0)
        .round()
        .to_kind(Kind::Uint8)
        .permute([1, 2, 0])
        .contiguous()
        .reshape([-1]);
    let pixels = Vec::<u8>::try_from(&hwc)
        .map_err(|e| PipelineError::runtime("to-image", e.to_string()))?;

    let image = match channels {
        1 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        c => {
            return Err(PipelineError::runtime(
                "to-image",
                format!("unsupported channel count {}", c),
            ))
        }
    };
    image.ok_or_else(|| PipelineError::runtime("to-image", "pixel buffer size mismatch"))
}
