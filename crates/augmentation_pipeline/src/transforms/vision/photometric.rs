use crate::error::{PipelineError, PipelineResult};
use crate::transforms::{Frame, Transform};
use anyhow::{Context, Result};
use tch::Tensor;

/// Per-channel statistics shared by both normalizers.
#[derive(Debug, Clone)]
struct ChannelStats {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl ChannelStats {
    fn new(mean: &[f32], std: &[f32]) -> PipelineResult<Self> {
        if mean.is_empty() {
            return Err(PipelineError::invalid("normalization mean cannot be empty"));
        }
        if mean.len() != std.len() {
            return Err(PipelineError::invalid(format!(
                "normalization mean has {} channels but std has {}",
                mean.len(),
                std.len()
            )));
        }
        if std.iter().any(|s| *s <= 0.0) {
            return Err(PipelineError::invalid(
                "normalization std must be strictly positive",
            ));
        }
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        })
    }

    /// `(x - mean[c]) / std[c]` over a `[C, H, W]` tensor.
    fn standardize(&self, tensor: Tensor, primitive: &'static str) -> Result<Tensor> {
        let (num_channels, _height, _width) = tensor
            .size3()
            .context("Input must be 3D tensor [C, H, W]")?;

        if num_channels as usize != self.mean.len() {
            return Err(PipelineError::runtime(
                primitive,
                format!(
                    "input has {} channels but normalization expects {}",
                    num_channels,
                    self.mean.len()
                ),
            )
            .into());
        }

        let mean_t = Tensor::from_slice(&self.mean)
            .reshape([num_channels, 1, 1])
            .to_kind(tensor.kind());
        let std_t = Tensor::from_slice(&self.std)
            .reshape([num_channels, 1, 1])
            .to_kind(tensor.kind());

        Ok((tensor - mean_t) / std_t)
    }
}

// ============================================================================
// TensorNormalize
// ============================================================================

/// Normalizes an already-scaled tensor using channel-wise statistics.
///
/// # Mathematical Operation:
/// ```text
/// output[c,h,w] = (input[c,h,w] - mean[c]) / std[c]
/// ```
#[derive(Debug, Clone)]
pub struct TensorNormalize {
    stats: ChannelStats,
}

impl TensorNormalize {
    pub fn new(mean: &[f32], std: &[f32]) -> PipelineResult<Self> {
        Ok(Self {
            stats: ChannelStats::new(mean, std)?,
        })
    }
}

impl Transform<Frame, Frame> for TensorNormalize {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| match f {
            Frame::Tensor(t) => Ok(Frame::Tensor(
                self.stats.standardize(t, "tensor-normalize")?,
            )),
            other => Err(PipelineError::runtime(
                "tensor-normalize",
                format!("expected a tensor, got {}", other.kind_name()),
            )
            .into()),
        })
    }
}

// ============================================================================
// Normalize
// ============================================================================

/// Rescales pixel values from `0..=255` to `[0, 1]`, then standardizes.
///
/// ```text
/// output[c,h,w] = (input[c,h,w] / 255 - mean[c]) / std[c]
/// ```
///
/// Accepts images, arrays and tensors; always produces an array. The input
/// is assumed to be in the pixel domain. A tensor that was already scaled
/// (the legacy grayscale path) is divided by 255 a second time.
#[derive(Debug, Clone)]
pub struct Normalize {
    stats: ChannelStats,
}

impl Normalize {
    pub fn new(mean: &[f32], std: &[f32]) -> PipelineResult<Self> {
        Ok(Self {
            stats: ChannelStats::new(mean, std)?,
        })
    }
}

impl Transform<Frame, Frame> for Normalize {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| {
            let scaled = f.into_array("normalize")? / 255.0;
            Ok(Frame::Array(self.stats.standardize(scaled, "normalize")?))
        })
    }
}
