//! Raw dataset providers.
//!
//! A provider hands the loader factory the undecorated `(image, label)`
//! items of one split. Downloading and caching packaged datasets happens
//! outside this crate; anything that can produce decoded images implements
//! [`RawDatasetProvider`].

pub mod image_dir;

pub use image_dir::ImageFolderProvider;

use crate::dataset::LabeledImage;
use anyhow::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait RawDatasetProvider: Send + Sync {
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>>;
}

/// Serves pre-decoded splits, e.g. images unpacked from a dataset archive.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    train: Vec<LabeledImage>,
    test: Vec<LabeledImage>,
}

impl InMemoryProvider {
    pub fn new(train: Vec<LabeledImage>, test: Vec<LabeledImage>) -> Self {
        Self { train, test }
    }
}

impl RawDatasetProvider for InMemoryProvider {
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>> {
        Ok(match split {
            Split::Train => self.train.clone(),
            Split::Test => self.test.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    #[test]
    fn test_in_memory_provider_splits() -> Result<()> {
        let item = |label| LabeledImage::new(DynamicImage::new_luma8(2, 2), label);
        let provider = InMemoryProvider::new(vec![item(0), item(1)], vec![item(2)]);

        assert_eq!(provider.load(Split::Train)?.len(), 2);
        let test = provider.load(Split::Test)?;
        assert_eq!(test.len(), 1);
        assert_eq!(test[0].label, 2);
        assert_eq!(Split::Test.to_string(), "test");
        Ok(())
    }
}
