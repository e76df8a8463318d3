use crate::dataloader::with_worker_rng;
use crate::error::{PipelineError, PipelineResult};
use crate::transforms::{Frame, Transform};
use anyhow::Result;
use image::{DynamicImage, ImageBuffer, Pixel};
use rand::Rng;

// ============================================================================
// RandomCrop
// ============================================================================

/// Zero-pads an image on every side, then crops a `size × size` window at a
/// uniformly drawn offset.
///
/// The offset comes from the worker RNG, so two workers seeded differently
/// crop differently while a reseeded worker replays the same crops.
///
/// # Example
/// ```ignore
/// let crop = RandomCrop::new(32, 4)?; // CIFAR-style crop
/// let cropped = crop.apply(Frame::Image(img))?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomCrop {
    size: u32,
    padding: u32,
}

impl RandomCrop {
    pub fn new(size: u32, padding: u32) -> PipelineResult<Self> {
        if size == 0 {
            return Err(PipelineError::invalid("random crop size must be positive"));
        }
        Ok(Self { size, padding })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Draws the `(top, left)` offset of the crop window inside the padded
    /// `width × height` image.
    pub fn draw_offset(&self, width: u32, height: u32) -> PipelineResult<(u32, u32)> {
        let padded = |side: u32| {
            self.padding
                .checked_mul(2)
                .and_then(|pad| pad.checked_add(side))
                .ok_or_else(|| {
                    PipelineError::runtime(
                        "random-crop",
                        format!("padding {} overflows a side of {}", self.padding, side),
                    )
                })
        };
        let padded_w = padded(width)?;
        let padded_h = padded(height)?;
        if padded_w < self.size || padded_h < self.size {
            return Err(PipelineError::runtime(
                "random-crop",
                format!(
                    "padded image {}x{} is smaller than the {}x{} crop",
                    padded_w, padded_h, self.size, self.size
                ),
            ));
        }

        Ok(with_worker_rng(|rng| {
            let top = rng.random_range(0..=padded_h - self.size);
            let left = rng.random_range(0..=padded_w - self.size);
            (top, left)
        }))
    }

    fn crop(&self, img: DynamicImage) -> PipelineResult<DynamicImage> {
        let (top, left) = self.draw_offset(img.width(), img.height())?;
        let (pad, size) = (self.padding, self.size);

        Ok(match img {
            DynamicImage::ImageLuma8(buf) => {
                DynamicImage::ImageLuma8(pad_and_crop(&buf, pad, top, left, size))
            }
            DynamicImage::ImageRgb8(buf) => {
                DynamicImage::ImageRgb8(pad_and_crop(&buf, pad, top, left, size))
            }
            DynamicImage::ImageRgba8(buf) => {
                DynamicImage::ImageRgba8(pad_and_crop(&buf, pad, top, left, size))
            }
            other => DynamicImage::ImageRgb8(pad_and_crop(&other.to_rgb8(), pad, top, left, size)),
        })
    }
}

/// Reads the `size × size` window at `(top, left)` of the image as if it were
/// surrounded by `padding` zero pixels.
fn pad_and_crop<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    padding: u32,
    top: u32,
    left: u32,
    size: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    const ZEROS: [u8; 4] = [0; 4];
    let fill = *P::from_slice(&ZEROS[..P::CHANNEL_COUNT as usize]);
    let pad = padding as i64;

    ImageBuffer::from_fn(size, size, |x, y| {
        let sx = left as i64 + x as i64 - pad;
        let sy = top as i64 + y as i64 - pad;
        if sx >= 0 && sy >= 0 && (sx as u32) < src.width() && (sy as u32) < src.height() {
            *src.get_pixel(sx as u32, sy as u32)
        } else {
            fill
        }
    })
}

impl Transform<Frame, Frame> for RandomCrop {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| match f {
            Frame::Image(img) => Ok(Frame::Image(self.crop(img)?)),
            other => Err(PipelineError::runtime(
                "random-crop",
                format!("expected an image, got {}", other.kind_name()),
            )
            .into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataloader::init_worker_rng;
    use image::{GenericImageView, GrayImage, Luma};

    fn numbered_image(size: u32) -> DynamicImage {
        let img = GrayImage::from_fn(size, size, |x, y| Luma([(y * size + x + 1) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_crop_keeps_target_size() -> Result<()> {
        init_worker_rng(7);
        let crop = RandomCrop::new(8, 2)?;
        for _ in 0..20 {
            let out = crop.apply(Frame::Image(numbered_image(8)))?;
            match out {
                Frame::Image(img) => assert_eq!(img.dimensions(), (8, 8)),
                other => panic!("unexpected frame {}", other.kind_name()),
            }
        }
        Ok(())
    }

    #[test]
    fn test_crop_without_padding_is_identity() -> Result<()> {
        let crop = RandomCrop::new(4, 0)?;
        let original = numbered_image(4);
        let out = crop.apply(Frame::Image(original.clone()))?;
        match out {
            Frame::Image(img) => assert_eq!(img.as_bytes(), original.as_bytes()),
            other => panic!("unexpected frame {}", other.kind_name()),
        }
        Ok(())
    }

    #[test]
    fn test_padding_fills_with_zeros() {
        let src = GrayImage::from_pixel(2, 2, Luma([9]));
        // Window starting at the top-left corner of the padded canvas.
        let out = pad_and_crop(&src, 1, 0, 0, 2);
        assert_eq!(out.get_pixel(0, 0), &Luma([0]));
        assert_eq!(out.get_pixel(1, 1), &Luma([9]));
    }

    #[test]
    fn test_offsets_replay_after_reseed() -> Result<()> {
        let crop = RandomCrop::new(32, 4)?;
        init_worker_rng(11);
        let first: Vec<_> = (0..10)
            .map(|_| crop.draw_offset(32, 32))
            .collect::<PipelineResult<_>>()?;
        init_worker_rng(11);
        let second: Vec<_> = (0..10)
            .map(|_| crop.draw_offset(32, 32))
            .collect::<PipelineResult<_>>()?;
        assert_eq!(first, second);
        assert!(first.iter().all(|&(t, l)| t <= 8 && l <= 8));
        Ok(())
    }

    #[test]
    fn test_rejects_small_images_and_arrays() -> Result<()> {
        let crop = RandomCrop::new(32, 1)?;
        assert!(crop.apply(Frame::Image(numbered_image(8))).is_err());

        let array = tch::Tensor::zeros([1, 32, 32], (tch::Kind::Float, tch::Device::Cpu));
        let err = crop.apply(Frame::Array(array)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::TransformRuntime { .. })
        ));
        assert!(RandomCrop::new(0, 4).is_err());
        Ok(())
    }

    #[test]
    fn test_huge_padding_is_a_runtime_error() -> Result<()> {
        let crop = RandomCrop::new(8, u32::MAX / 2)?;
        assert!(matches!(
            crop.draw_offset(8, 8),
            Err(PipelineError::TransformRuntime { primitive: "random-crop", .. })
        ));
        assert!(crop.apply(Frame::Image(numbered_image(8))).is_err());
        Ok(())
    }
}
