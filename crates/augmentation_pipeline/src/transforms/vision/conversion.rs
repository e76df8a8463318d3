use crate::error::PipelineError;
use crate::transforms::frame::{array_to_image, image_to_array};
use crate::transforms::{Frame, Transform};
use anyhow::{Context, Result};
use image::DynamicImage;

// ============================================================================
// ToImage
// ============================================================================

/// Converts a pixel-domain `[C, H, W]` array back into an 8-bit image.
///
/// Values are clamped to `0..=255`. Images pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToImage;

impl Transform<Frame, Frame> for ToImage {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| match f {
            Frame::Image(img) => Ok(Frame::Image(img)),
            Frame::Array(t) => Ok(Frame::Image(array_to_image(&t)?)),
            other => Err(PipelineError::runtime(
                "to-image",
                format!("expected an array or image, got {}", other.kind_name()),
            )
            .into()),
        })
    }
}

// ============================================================================
// Grayscale
// ============================================================================

/// Converts an image to single-channel luma.
///
/// Uses the ITU-R 601-2 weights `L = 0.299 R + 0.587 G + 0.114 B`, rounded,
/// so results match the common 8-bit imaging convention exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl Grayscale {
    fn luma(img: DynamicImage) -> DynamicImage {
        match img {
            luma @ DynamicImage::ImageLuma8(_) => luma,
            other => {
                let rgb = other.to_rgb8();
                let gray = image::GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    let [r, g, b] = rgb.get_pixel(x, y).0;
                    let l = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000;
                    image::Luma([l as u8])
                });
                DynamicImage::ImageLuma8(gray)
            }
        }
    }
}

impl Transform<Frame, Frame> for Grayscale {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| match f {
            Frame::Image(img) => Ok(Frame::Image(Self::luma(img))),
            Frame::Array(t) => Ok(Frame::Image(Self::luma(array_to_image(&t)?))),
            other => Err(PipelineError::runtime(
                "grayscale",
                format!("expected an image, got {}", other.kind_name()),
            )
            .into()),
        })
    }
}

// ============================================================================
// ImageToTensor
// ============================================================================

/// Converts an image to a channel-first f32 tensor in [0.0, 1.0] range.
///
/// Channel Handling
/// | Input Format  | Output Shape |
/// |---------------|--------------|
/// | Grayscale (L) | `[1, H, W]`  |
/// | RGB           | `[3, H, W]`  |
/// | RGBA          | `[4, H, W]`  |
/// | Other         | `[3, H, W]`  |
///
/// # Example
/// ```ignore
/// let tensor = ImageToTensor.apply(Frame::Image(img))?.into_tensor()?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageToTensor;

impl Transform<Frame, Frame> for ImageToTensor {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| match f {
            Frame::Image(img) => {
                let tensor = image_to_array(&img)?
                    .f_div_scalar(255.0)
                    .context("Failed to scale tensor values")?;
                Ok(Frame::Tensor(tensor))
            }
            other => Err(PipelineError::runtime(
                "image-to-tensor",
                format!("expected an image, got {}", other.kind_name()),
            )
            .into()),
        })
    }
}

// ============================================================================
// ToTensor
// ============================================================================

/// Final step of every sequence: turns whatever the previous step produced
/// into a dense float tensor.
///
/// Arrays and tensors are taken as they are. Images are converted to
/// `[C, H, W]` without rescaling, matching how arrays are laid out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor;

impl Transform<Frame, Frame> for ToTensor {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| Ok(Frame::Tensor(f.into_array("to-tensor")?.contiguous())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tch::{Kind, Tensor};

    fn test_rgb_image() -> DynamicImage {
        let mut img = RgbImage::new(3, 3);
        for x in 0..3 {
            for y in 0..3 {
                img.put_pixel(x, y, Rgb([(x * 85) as u8, (y * 85) as u8, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_image_to_tensor_scales() -> Result<()> {
        let tensor = ImageToTensor
            .apply(Frame::Image(test_rgb_image()))?
            .into_tensor()?;
        assert_eq!(tensor.size(), vec![3, 3, 3]); // CHW format
        assert_eq!(tensor.kind(), Kind::Float);

        let min = tensor.f_min()?.double_value(&[]);
        let max = tensor.f_max()?.double_value(&[]);
        assert!(min >= 0.0 && max <= 1.0);
        // Pixel (x=2, y=0), red channel: 170 / 255
        assert!((tensor.double_value(&[0, 0, 2]) - 170.0 / 255.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_grayscale_weights() -> Result<()> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0])));
        match Grayscale.apply(Frame::Image(img))? {
            Frame::Image(DynamicImage::ImageLuma8(gray)) => assert_eq!(gray.as_raw(), &[76]),
            other => panic!("unexpected frame {}", other.kind_name()),
        }
        Ok(())
    }

    #[test]
    fn test_to_image_from_array() -> Result<()> {
        let array = Tensor::from_slice(&[12.4f32, 250.0, 0.0]).reshape([3, 1, 1]);
        match ToImage.apply(Frame::Array(array))? {
            Frame::Image(img) => assert_eq!(img.as_bytes(), &[12, 250, 0]),
            other => panic!("unexpected frame {}", other.kind_name()),
        }
        Ok(())
    }

    #[test]
    fn test_to_tensor_keeps_pixel_domain() -> Result<()> {
        let tensor = ToTensor
            .apply(Frame::Image(test_rgb_image()))?
            .into_tensor()?;
        assert_eq!(tensor.double_value(&[2, 1, 1]), 128.0);

        let pair = Frame::pair(Frame::Image(test_rgb_image()), Frame::Image(test_rgb_image()));
        assert_eq!(ToTensor.apply(pair)?.into_tensors()?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_image_to_tensor_rejects_arrays() {
        let array = Tensor::zeros([1, 2, 2], (Kind::Float, tch::Device::Cpu));
        assert!(ImageToTensor.apply(Frame::Array(array)).is_err());
    }
}
