use crate::dataloader::{with_worker_rng, worker_gen_bool};
use crate::error::{PipelineError, PipelineResult};
use crate::transforms::{Frame, Transform};
use anyhow::Result;
use rand::Rng;
use tch::Tensor;

/// Fills `[.., y0..y0+h, x0..x0+w]` of a `[C, H, W]` array in place.
fn fill_region(array: &Tensor, y0: i64, x0: i64, h: i64, w: i64, value: f64) {
    let mut region = array.narrow(1, y0, h).narrow(2, x0, w);
    let _ = region.fill_(value);
}

fn spatial_dims(array: &Tensor, primitive: &'static str) -> PipelineResult<(i64, i64)> {
    match array.size().as_slice() {
        [_, h, w] => Ok((*h, *w)),
        other => Err(PipelineError::runtime(
            primitive,
            format!("expected a [C, H, W] array, got shape {:?}", other),
        )),
    }
}

fn check_probability(name: &str, p: f64) -> PipelineResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(PipelineError::invalid(format!(
            "{} must be in [0.0, 1.0] (got {})",
            name, p
        )))
    }
}

// ============================================================================
// RandomHorizontalFlip
// ============================================================================

/// Mirrors images (or `[C, H, W]` arrays) left-to-right with probability `p`.
///
/// # Example
/// ```ignore
/// let flip = RandomHorizontalFlip::new(0.5)?;
/// let augmented = flip.apply(Frame::Image(img))?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomHorizontalFlip {
    p: f64,
}

impl RandomHorizontalFlip {
    pub fn new(p: f64) -> PipelineResult<Self> {
        check_probability("flip probability", p)?;
        Ok(Self { p })
    }

    pub fn probability(&self) -> f64 {
        self.p
    }

    fn flip(frame: Frame) -> PipelineResult<Frame> {
        match frame {
            Frame::Image(img) => Ok(Frame::Image(img.fliph())),
            Frame::Array(t) => {
                spatial_dims(&t, "horizontal-flip")?;
                Ok(Frame::Array(t.flip([2])))
            }
            other => Err(PipelineError::runtime(
                "horizontal-flip",
                format!("expected an image or array, got {}", other.kind_name()),
            )),
        }
    }
}

impl Transform<Frame, Frame> for RandomHorizontalFlip {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| {
            let flipped = match self.p {
                // Fast paths skip the RNG draw
                0.0 => f,
                1.0 => Self::flip(f)?,
                _ if worker_gen_bool(self.p) => Self::flip(f)?,
                _ => f,
            };
            Ok(flipped)
        })
    }
}

// ============================================================================
// RandomErasing
// ============================================================================

/// Erases one random rectangle with a random intensity.
///
/// With probability `p`, up to `max_attempt` candidate rectangles are drawn:
/// - area: `U(lo, hi) × H × W`
/// - aspect ratio: `U(r, 1/r)` with `r = min_aspect_ratio`
///
/// The first candidate that fits strictly inside the image is filled with a
/// single intensity drawn from `U(0, 255)`. The output is always an array.
#[derive(Debug, Clone)]
pub struct RandomErasing {
    p: f64,
    area_ratio_range: (f64, f64),
    min_aspect_ratio: f64,
    max_attempt: u32,
}

/// A rectangle selected by [`RandomErasing`], in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErasedRegion {
    pub top: i64,
    pub left: i64,
    pub height: i64,
    pub width: i64,
    pub value: f64,
}

impl RandomErasing {
    pub fn new(
        p: f64,
        area_ratio_range: [f64; 2],
        min_aspect_ratio: f64,
        max_attempt: u32,
    ) -> PipelineResult<Self> {
        check_probability("random_erasing_prob", p)?;
        let [lo, hi] = area_ratio_range;
        if !(0.0 < lo && lo <= hi && hi <= 1.0) {
            return Err(PipelineError::invalid(format!(
                "random_erasing_area_ratio_range must satisfy 0 < lo <= hi <= 1 (got [{}, {}])",
                lo, hi
            )));
        }
        if !(min_aspect_ratio > 0.0 && min_aspect_ratio <= 1.0) {
            return Err(PipelineError::invalid(format!(
                "random_erasing_min_aspect_ratio must be in (0, 1] (got {})",
                min_aspect_ratio
            )));
        }
        Ok(Self {
            p,
            area_ratio_range: (lo, hi),
            min_aspect_ratio,
            max_attempt,
        })
    }

    /// Draws the rectangle to erase from a `height × width` image, if any.
    pub fn draw_region(&self, height: i64, width: i64) -> Option<ErasedRegion> {
        let (lo, hi) = self.area_ratio_range;
        let (rl, rh) = (self.min_aspect_ratio, 1.0 / self.min_aspect_ratio);
        let image_area = (height * width) as f64;

        with_worker_rng(|rng| {
            if rng.random::<f64>() > self.p {
                return None;
            }
            for _ in 0..self.max_attempt {
                let mask_area = rng.random_range(lo..=hi) * image_area;
                let aspect_ratio = rng.random_range(rl..=rh);
                let mask_h = (mask_area * aspect_ratio).sqrt() as i64;
                let mask_w = (mask_area / aspect_ratio).sqrt() as i64;

                if mask_w < width && mask_h < height {
                    let left = rng.random_range(0..width - mask_w);
                    let top = rng.random_range(0..height - mask_h);
                    let value = rng.random::<f64>() * 255.0;
                    return Some(ErasedRegion {
                        top,
                        left,
                        height: mask_h,
                        width: mask_w,
                        value,
                    });
                }
            }
            None
        })
    }
}

impl Transform<Frame, Frame> for RandomErasing {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| {
            let array = f.into_array("random-erasing")?.copy();
            let (height, width) = spatial_dims(&array, "random-erasing")?;
            if let Some(r) = self.draw_region(height, width) {
                fill_region(&array, r.top, r.left, r.height, r.width, r.value);
            }
            Ok(Frame::Array(array))
        })
    }
}

// ============================================================================
// Cutout / DualCutout
// ============================================================================

/// Masks a `mask_size × mask_size` square with zeros, with probability `p`.
///
/// The square is centered on a uniformly drawn pixel. With `cutout_inside`
/// the center is restricted so the full mask lies inside the image;
/// otherwise the mask may hang over the border and is clipped.
#[derive(Debug, Clone)]
pub struct Cutout {
    mask_size: u32,
    p: f64,
    cutout_inside: bool,
    mask_color: f64,
}

impl Cutout {
    pub fn new(mask_size: u32, p: f64, cutout_inside: bool) -> PipelineResult<Self> {
        if mask_size == 0 {
            return Err(PipelineError::invalid("cutout_size must be positive"));
        }
        check_probability("cutout_prob", p)?;
        Ok(Self {
            mask_size,
            p,
            cutout_inside,
            mask_color: 0.0,
        })
    }

    pub fn mask_size(&self) -> u32 {
        self.mask_size
    }

    /// Draws the clipped mask rectangle `(top, left, height, width)`, or
    /// `None` when the probability draw skips the mask.
    ///
    /// A mask that cannot be placed is only an error when it is drawn.
    pub fn draw_mask(&self, height: i64, width: i64) -> PipelineResult<Option<(i64, i64, i64, i64)>> {
        if with_worker_rng(|rng| rng.random::<f64>()) > self.p {
            return Ok(None);
        }

        let size = self.mask_size as i64;
        let half = size / 2;
        let offset = if size % 2 == 0 { 1 } else { 0 };

        let (cx_range, cy_range) = if self.cutout_inside {
            ((half, width + offset - half), (half, height + offset - half))
        } else {
            ((0, width + offset), (0, height + offset))
        };
        if cx_range.0 >= cx_range.1 || cy_range.0 >= cy_range.1 {
            return Err(PipelineError::runtime(
                "cutout",
                format!(
                    "mask of size {} does not fit inside a {}x{} image",
                    size, width, height
                ),
            ));
        }

        Ok(with_worker_rng(|rng| {
            let cx = rng.random_range(cx_range.0..cx_range.1);
            let cy = rng.random_range(cy_range.0..cy_range.1);

            let xmin = (cx - half).max(0);
            let ymin = (cy - half).max(0);
            let xmax = (cx - half + size).min(width);
            let ymax = (cy - half + size).min(height);
            Some((ymin, xmin, ymax - ymin, xmax - xmin))
        }))
    }

    fn cut(&self, array: Tensor) -> PipelineResult<Tensor> {
        let (height, width) = spatial_dims(&array, "cutout")?;
        if let Some((top, left, h, w)) = self.draw_mask(height, width)? {
            fill_region(&array, top, left, h, w, self.mask_color);
        }
        Ok(array)
    }
}

impl Transform<Frame, Frame> for Cutout {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| {
            let array = f.into_array("cutout")?.copy();
            Ok(Frame::Array(self.cut(array)?))
        })
    }
}

/// Produces two independently cut-out copies of one image, for losses that
/// compare two augmented views.
#[derive(Debug, Clone)]
pub struct DualCutout {
    cutout: Cutout,
}

impl DualCutout {
    pub fn new(mask_size: u32, p: f64, cutout_inside: bool) -> PipelineResult<Self> {
        Ok(Self {
            cutout: Cutout::new(mask_size, p, cutout_inside)?,
        })
    }
}

impl Transform<Frame, Frame> for DualCutout {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        let array = frame.into_array("dual-cutout")?;
        let first = self.cutout.cut(array.copy())?;
        let second = self.cutout.cut(array.copy())?;
        Ok(Frame::pair(Frame::Array(first), Frame::Array(second)))
    }
}
