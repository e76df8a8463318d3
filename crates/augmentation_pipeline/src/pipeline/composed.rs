use super::sequence::TransformSequence;
use crate::dataset::LabeledImage;
use crate::sample::{Sample, DUAL_IMAGE_FEATURE, IMAGE_FEATURE, LABEL_FEATURE};
use crate::transforms::{Frame, Transform};
use anyhow::{bail, Result};
use std::sync::Arc;
use tch::Tensor;

/// The single callable attached to a dataset: runs a [`TransformSequence`]
/// on the image and packs the result with its label.
///
/// | sequence output | sample features                    |
/// |-----------------|------------------------------------|
/// | one tensor      | `image`, `label`                   |
/// | tensor pair     | `image`, `image_dual`, `label`     |
#[derive(Debug, Clone)]
pub struct ComposedTransform {
    sequence: Arc<TransformSequence>,
}

impl ComposedTransform {
    pub fn new(sequence: TransformSequence) -> Self {
        Self {
            sequence: Arc::new(sequence),
        }
    }

    pub fn sequence(&self) -> &TransformSequence {
        &self.sequence
    }
}

impl Transform<LabeledImage, Sample> for ComposedTransform {
    fn apply(&self, item: LabeledImage) -> Result<Sample> {
        let output = self.sequence.apply(Frame::Image(item.image))?;
        let mut views = output.into_tensors()?.into_iter();

        let Some(image) = views.next() else {
            bail!("transform sequence produced no tensor");
        };
        let mut sample = Sample::from_single(IMAGE_FEATURE, image)
            .with_feature(LABEL_FEATURE, Tensor::from(item.label));
        if let Some(dual) = views.next() {
            sample = sample.with_feature(DUAL_IMAGE_FEATURE, dual);
        }
        Ok(sample)
    }
}
