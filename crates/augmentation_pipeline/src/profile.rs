//! Dataset-family profiles.
//!
//! A profile bundles the constants every pipeline for a dataset shares:
//! spatial size, per-channel normalization statistics and the loading
//! convention. Two families exist:
//!
//! | Family    | Datasets                        | Size | Channels |
//! |-----------|---------------------------------|------|----------|
//! | RGB       | CIFAR10, CIFAR100               | 32   | 3        |
//! | Grayscale | MNIST, FashionMNIST, KMNIST, K49 | 28   | 1        |
//!
//! K49 is stored as an image-folder tree instead of a packaged archive, and
//! its pipelines take the legacy normalization path.

use crate::error::{PipelineError, PipelineResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported dataset identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetId {
    Cifar10,
    Cifar100,
    Mnist,
    FashionMnist,
    Kmnist,
    K49,
}

impl DatasetId {
    pub const ALL: [DatasetId; 6] = [
        DatasetId::Cifar10,
        DatasetId::Cifar100,
        DatasetId::Mnist,
        DatasetId::FashionMnist,
        DatasetId::Kmnist,
        DatasetId::K49,
    ];

    /// The identifier as written in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetId::Cifar10 => "CIFAR10",
            DatasetId::Cifar100 => "CIFAR100",
            DatasetId::Mnist => "MNIST",
            DatasetId::FashionMnist => "FashionMNIST",
            DatasetId::Kmnist => "KMNIST",
            DatasetId::K49 => "K49",
        }
    }

    pub fn family(&self) -> DatasetFamily {
        match self {
            DatasetId::Cifar10 | DatasetId::Cifar100 => DatasetFamily::Rgb,
            _ => DatasetFamily::Grayscale,
        }
    }
}

impl FromStr for DatasetId {
    type Err = PipelineError;

    fn from_str(name: &str) -> PipelineResult<Self> {
        DatasetId::ALL
            .into_iter()
            .find(|id| id.as_str() == name)
            .ok_or_else(|| PipelineError::UnsupportedDataset {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFamily {
    Rgb,
    Grayscale,
}

/// How the raw files of a dataset are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLayout {
    /// Packaged archive fetched and decoded by an external provider.
    Archive,
    /// `train/<class>/*` and `test/<class>/*` directory trees.
    ImageFolder,
}

/// Constants shared by every pipeline built for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetProfile {
    pub id: DatasetId,
    pub family: DatasetFamily,
    /// Side length of the square training crop.
    pub size: u32,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    pub grayscale: bool,
    /// Requires the array → image → grayscale → tensor → normalize block.
    pub legacy_normalization: bool,
    pub layout: StorageLayout,
}

impl DatasetProfile {
    /// Returns the profile for a known dataset.
    pub fn resolve(id: DatasetId) -> Self {
        let (mean, std): (&[f32], &[f32]) = match id {
            DatasetId::Cifar10 => (&[0.4914, 0.4822, 0.4465], &[0.2470, 0.2435, 0.2616]),
            DatasetId::Cifar100 => (&[0.5071, 0.4865, 0.4409], &[0.2673, 0.2564, 0.2762]),
            DatasetId::Mnist => (&[0.1307], &[0.3081]),
            DatasetId::FashionMnist => (&[0.2860], &[0.3530]),
            DatasetId::Kmnist | DatasetId::K49 => (&[0.1904], &[0.3475]),
        };

        let family = id.family();
        let image_folder = id == DatasetId::K49;

        Self {
            id,
            family,
            size: match family {
                DatasetFamily::Rgb => 32,
                DatasetFamily::Grayscale => 28,
            },
            mean: mean.to_vec(),
            std: std.to_vec(),
            grayscale: family == DatasetFamily::Grayscale,
            legacy_normalization: image_folder,
            layout: if image_folder {
                StorageLayout::ImageFolder
            } else {
                StorageLayout::Archive
            },
        }
    }

    /// Parses a dataset name and returns its profile.
    ///
    /// Unknown names fail with [`PipelineError::UnsupportedDataset`].
    pub fn for_name(name: &str) -> PipelineResult<Self> {
        Ok(Self::resolve(name.parse()?))
    }

    /// Number of channels described by the normalization statistics.
    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    /// Directory holding this dataset below `root`.
    pub fn dataset_dir(&self, root: &Path) -> PathBuf {
        match self.layout {
            StorageLayout::Archive => root.join(self.id.as_str()),
            StorageLayout::ImageFolder => root.join("Kuzushiji-49"),
        }
    }
}
