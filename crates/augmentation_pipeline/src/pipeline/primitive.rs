use crate::transforms::vision::{
    Cutout, DualCutout, Grayscale, ImageToTensor, Normalize, RandomCrop, RandomErasing,
    RandomHorizontalFlip, TensorNormalize, ToImage, ToTensor, Tubify,
};
use crate::transforms::{Frame, Transform};
use anyhow::Result;
use std::fmt;

/// Discriminant of a [`Primitive`], for inspecting built sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    RandomCrop,
    HorizontalFlip,
    RandomErasing,
    Cutout,
    DualCutout,
    ToImage,
    Grayscale,
    ImageToTensor,
    TensorNormalize,
    Normalize,
    Tubify,
    ToTensor,
}

impl PrimitiveKind {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::RandomCrop => "random-crop",
            PrimitiveKind::HorizontalFlip => "horizontal-flip",
            PrimitiveKind::RandomErasing => "random-erasing",
            PrimitiveKind::Cutout => "cutout",
            PrimitiveKind::DualCutout => "dual-cutout",
            PrimitiveKind::ToImage => "to-image",
            PrimitiveKind::Grayscale => "grayscale",
            PrimitiveKind::ImageToTensor => "image-to-tensor",
            PrimitiveKind::TensorNormalize => "tensor-normalize",
            PrimitiveKind::Normalize => "normalize",
            PrimitiveKind::Tubify => "tubify",
            PrimitiveKind::ToTensor => "to-tensor",
        }
    }

    /// Whether the primitive draws from the worker RNG.
    pub fn is_random(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::RandomCrop
                | PrimitiveKind::HorizontalFlip
                | PrimitiveKind::RandomErasing
                | PrimitiveKind::Cutout
                | PrimitiveKind::DualCutout
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One configured step of a [`TransformSequence`](super::TransformSequence).
///
/// A closed set of variants dispatched with a `match`; each wraps the
/// parameters it captured when the sequence was built.
#[derive(Debug, Clone)]
pub enum Primitive {
    RandomCrop(RandomCrop),
    HorizontalFlip(RandomHorizontalFlip),
    RandomErasing(RandomErasing),
    Cutout(Cutout),
    DualCutout(DualCutout),
    ToImage(ToImage),
    Grayscale(Grayscale),
    ImageToTensor(ImageToTensor),
    TensorNormalize(TensorNormalize),
    Normalize(Normalize),
    Tubify(Tubify),
    ToTensor(ToTensor),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::RandomCrop(_) => PrimitiveKind::RandomCrop,
            Primitive::HorizontalFlip(_) => PrimitiveKind::HorizontalFlip,
            Primitive::RandomErasing(_) => PrimitiveKind::RandomErasing,
            Primitive::Cutout(_) => PrimitiveKind::Cutout,
            Primitive::DualCutout(_) => PrimitiveKind::DualCutout,
            Primitive::ToImage(_) => PrimitiveKind::ToImage,
            Primitive::Grayscale(_) => PrimitiveKind::Grayscale,
            Primitive::ImageToTensor(_) => PrimitiveKind::ImageToTensor,
            Primitive::TensorNormalize(_) => PrimitiveKind::TensorNormalize,
            Primitive::Normalize(_) => PrimitiveKind::Normalize,
            Primitive::Tubify(_) => PrimitiveKind::Tubify,
            Primitive::ToTensor(_) => PrimitiveKind::ToTensor,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

impl Transform<Frame, Frame> for Primitive {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        match self {
            Primitive::RandomCrop(t) => t.apply(frame),
            Primitive::HorizontalFlip(t) => t.apply(frame),
            Primitive::RandomErasing(t) => t.apply(frame),
            Primitive::Cutout(t) => t.apply(frame),
            Primitive::DualCutout(t) => t.apply(frame),
            Primitive::ToImage(t) => t.apply(frame),
            Primitive::Grayscale(t) => t.apply(frame),
            Primitive::ImageToTensor(t) => t.apply(frame),
            Primitive::TensorNormalize(t) => t.apply(frame),
            Primitive::Normalize(t) => t.apply(frame),
            Primitive::Tubify(t) => t.apply(frame),
            Primitive::ToTensor(t) => t.apply(frame),
        }
    }
}
