//! Depth expansion ("tubify") for volumetric models.
//!
//! A 2-D input is repeated `d` times along a new leading axis, each slice
//! scaled by a Gaussian-shaped weight centered at `d / 2`:
//!
//! ```text
//! w(k) = exp(-(1/d) * (k - d/2)^2),   k = 0..d
//! out[k] = w(k) * x
//! ```
//!
//! | Input       | Output         |
//! |-------------|----------------|
//! | `[H, W]`    | `[d, 1, H, W]` |
//! | `[C, H, W]` | `[d, C, H, W]` |

use crate::config::DEFAULT_TUBIFY_DEPTH;
use crate::error::{PipelineError, PipelineResult};
use crate::transforms::{Frame, Transform};
use anyhow::Result;
use tch::{Kind, Tensor};

#[derive(Debug, Clone)]
pub struct Tubify {
    depth: usize,
}

impl Tubify {
    pub fn new(depth: usize) -> PipelineResult<Self> {
        if depth == 0 {
            return Err(PipelineError::invalid("tubify_depth must be positive"));
        }
        Ok(Self { depth })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The per-slice weights, peaking at `1.0` for `k = d / 2`.
    pub fn weights(&self) -> Vec<f64> {
        let d = self.depth as f64;
        let center = d / 2.0;
        (0..self.depth)
            .map(|k| (-(1.0 / d) * (k as f64 - center).powi(2)).exp())
            .collect()
    }

    fn expand(&self, x: &Tensor) -> PipelineResult<Tensor> {
        let x = match x.dim() {
            2 => x.unsqueeze(0),
            3 => x.shallow_clone(),
            d => {
                return Err(PipelineError::runtime(
                    "tubify",
                    format!("expected a [H, W] or [C, H, W] input, got {} dims", d),
                ))
            }
        };
        let x = x.to_kind(Kind::Float);
        let slices: Vec<Tensor> = self.weights().into_iter().map(|w| &x * w).collect();
        Ok(Tensor::stack(&slices, 0))
    }
}

impl Default for Tubify {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TUBIFY_DEPTH,
        }
    }
}

impl Transform<Frame, Frame> for Tubify {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.map(|f| match f {
            Frame::Tensor(t) => Ok(Frame::Tensor(self.expand(&t)?)),
            other => {
                let array = other.into_array("tubify")?;
                Ok(Frame::Array(self.expand(&array)?))
            }
        })
    }
}
