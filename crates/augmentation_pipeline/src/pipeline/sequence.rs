use super::primitive::{Primitive, PrimitiveKind};
use crate::transforms::{Frame, Transform};
use anyhow::{Context, Result};
use image::DynamicImage;

/// An ordered, immutable list of primitives applied left to right.
///
/// Built once by [`PipelineBuilder`](super::PipelineBuilder) and then
/// shared read-only by every loader worker. A failing step is reported
/// with its position and name.
#[derive(Debug, Clone)]
pub struct TransformSequence {
    primitives: Vec<Primitive>,
}

impl TransformSequence {
    pub(crate) fn new(primitives: Vec<Primitive>) -> Self {
        Self { primitives }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn kinds(&self) -> Vec<PrimitiveKind> {
        self.primitives.iter().map(Primitive::kind).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.primitives.iter().map(Primitive::name).collect()
    }

    /// Whether no step draws from the worker RNG.
    pub fn is_deterministic(&self) -> bool {
        !self.primitives.iter().any(|p| p.kind().is_random())
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Applies every primitive to an 8-bit image.
    pub fn apply_image(&self, image: DynamicImage) -> Result<Frame> {
        self.apply(Frame::Image(image))
    }
}

impl Transform<Frame, Frame> for TransformSequence {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        self.primitives
            .iter()
            .enumerate()
            .try_fold(frame, |frame, (step, primitive)| {
                primitive
                    .apply(frame)
                    .with_context(|| format!("step {} ({}) failed", step, primitive.name()))
            })
    }
}
