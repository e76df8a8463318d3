use crate::sample::Sample;
use crate::transforms::Transform;
use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use std::fmt;
use std::sync::Arc;

/// One undecorated dataset item: a decoded image and its class index.
#[derive(Debug, Clone)]
pub struct LabeledImage {
    pub image: DynamicImage,
    pub label: i64,
}

impl LabeledImage {
    pub fn new(image: DynamicImage, label: i64) -> Self {
        Self { image, label }
    }
}

/// A random-access dataset held entirely in memory.
///
/// Raw items live in one `Arc<[Raw]>` and the transform behind an `Arc`, so
/// cloning the dataset (one handle per loader worker) never copies data.
/// The transform runs lazily in [`get_sample`](Self::get_sample), on the
/// calling worker's thread and with that worker's RNG.
///
/// ```ignore
/// let dataset = InMemoryDataset::new(images).with_transform(composed);
/// let sample = dataset.get_sample(0)?;
/// ```
pub struct InMemoryDataset<Raw> {
    data: Arc<[Raw]>,
    transform: Option<Arc<dyn Transform<Raw, Sample>>>,
}

impl<Raw> Clone for InMemoryDataset<Raw> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            transform: self.transform.clone(),
        }
    }
}

impl<Raw> fmt::Debug for InMemoryDataset<Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDataset")
            .field("len", &self.data.len())
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

impl<Raw> InMemoryDataset<Raw> {
    pub fn new(data: Vec<Raw>) -> Self {
        Self {
            data: data.into(),
            transform: None,
        }
    }

    /// Attaches the transform that turns raw items into samples.
    pub fn with_transform<T>(mut self, transform: T) -> Self
    where
        T: Transform<Raw, Sample> + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_raw(&self, index: usize) -> Option<&Raw> {
        self.data.get(index)
    }
}

impl<Raw: Clone> InMemoryDataset<Raw> {
    /// Transforms item `index` into a [`Sample`].
    pub fn get_sample(&self, index: usize) -> Result<Sample> {
        let raw = self.data.get(index).ok_or_else(|| {
            anyhow!(
                "Index {} out of bounds for dataset of size {}",
                index,
                self.data.len()
            )
        })?;
        let transform = self
            .transform
            .as_ref()
            .ok_or_else(|| anyhow!("Dataset has no transform attached"))?;

        transform
            .apply(raw.clone())
            .with_context(|| format!("Failed to transform sample {}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{IMAGE_FEATURE, LABEL_FEATURE};
    use tch::Tensor;

    struct LabelOnly;
    impl Transform<LabeledImage, Sample> for LabelOnly {
        fn apply(&self, item: LabeledImage) -> Result<Sample> {
            Ok(Sample::from_single(LABEL_FEATURE, Tensor::from(item.label))
                .with_feature(IMAGE_FEATURE, Tensor::from(item.image.width() as i64)))
        }
    }

    fn items(n: usize) -> Vec<LabeledImage> {
        (0..n)
            .map(|i| LabeledImage::new(DynamicImage::new_luma8(i as u32 + 1, 1), i as i64))
            .collect()
    }

    #[test]
    fn test_get_sample_applies_transform() -> Result<()> {
        let dataset = InMemoryDataset::new(items(3)).with_transform(LabelOnly);
        assert_eq!(dataset.len(), 3);

        let sample = dataset.get_sample(2)?;
        assert_eq!(sample.label()?, 2);
        assert_eq!(sample.image()?.int64_value(&[]), 3);
        Ok(())
    }

    #[test]
    fn test_out_of_bounds_and_missing_transform() {
        let bare = InMemoryDataset::new(items(2));
        assert!(bare.get_sample(0).is_err());
        assert_eq!(bare.get_raw(1).map(|r| r.label), Some(1));

        let dataset = bare.with_transform(LabelOnly);
        let err = dataset.get_sample(5).unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn test_clone_shares_items() {
        let dataset = InMemoryDataset::new(items(4)).with_transform(LabelOnly);
        let handle = dataset.clone();
        assert!(Arc::ptr_eq(&dataset.data, &handle.data));
    }
}
