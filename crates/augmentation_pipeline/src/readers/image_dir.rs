use crate::dataset::LabeledImage;
use crate::readers::{RawDatasetProvider, Split};
use anyhow::{anyhow, bail, Context, Result};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Reads a class-per-directory image tree:
///
/// ```text
/// <root>/
/// ├── train/
/// │   ├── 0/ *.png
/// │   └── 1/ *.png
/// └── test/
///     ├── 0/ *.png
///     └── 1/ *.png
/// ```
///
/// Labels are the index of each class directory in sorted name order, so
/// the mapping is stable across machines. Files are decoded eagerly when a
/// split is loaded and converted to RGB, or to single-channel luma when
/// [`with_grayscale`](Self::with_grayscale) is set, whatever pixel mode
/// they were stored in.
///
/// # Example
/// ```ignore
/// let provider = ImageFolderProvider::new("~/data/Kuzushiji/Kuzushiji-49");
/// let train = provider.load(Split::Train)?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageFolderProvider {
    root: PathBuf,
    extensions: Vec<String>,
    grayscale: bool,
}

impl ImageFolderProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            grayscale: false,
        }
    }

    /// Decodes every file to single-channel luma instead of RGB.
    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn grayscale(&self) -> bool {
        self.grayscale
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode image: {}", path.display()))?;
        Ok(if self.grayscale {
            DynamicImage::ImageLuma8(image.to_luma8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        })
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_lowercase()))
    }

    /// Sorted class directories of one split.
    fn class_dirs(&self, split_dir: &Path) -> Result<Vec<PathBuf>> {
        let dir_metadata = fs::metadata(split_dir)
            .with_context(|| format!("Failed to access directory: {}", split_dir.display()))?;
        if !dir_metadata.is_dir() {
            bail!("Path is not a directory: {}", split_dir.display());
        }

        let mut classes = Vec::new();
        for entry in fs::read_dir(split_dir)? {
            let path = entry
                .map_err(|e| anyhow!("Failed to read directory entry: {}", e))?
                .path();
            if path.is_dir() {
                classes.push(path);
            }
        }
        classes.sort();
        Ok(classes)
    }

    /// Image files under one class directory, recursively, in sorted order.
    fn class_files(&self, class_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(class_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| anyhow!("Failed to read directory entry: {}", e))?;
            if entry.file_type().is_file() && self.is_image(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

impl RawDatasetProvider for ImageFolderProvider {
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>> {
        let split_dir = self.root.join(split.as_str());
        let classes = self.class_dirs(&split_dir)?;

        let mut items = Vec::new();
        for (label, class_dir) in classes.iter().enumerate() {
            for path in self.class_files(class_dir)? {
                items.push(LabeledImage::new(self.decode(&path)?, label as i64));
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            %split,
            classes = classes.len(),
            items = items.len(),
            grayscale = self.grayscale,
            "loaded image folder split"
        );
        Ok(items)
    }
}
