//! Pipeline configuration.
//!
//! `PipelineConfig` is the single source of truth for the shape of both
//! pipelines. It mirrors the flat option mapping of the experiment
//! configuration files, so it can be read straight from JSON:
//!
//! ```ignore
//! let config = PipelineConfig::from_json_str(r#"{
//!     "dataset": "CIFAR10",
//!     "batch_size": 128,
//!     "num_workers": 4,
//!     "use_gpu": true,
//!     "use_random_crop": true,
//!     "random_crop_padding": 4,
//!     "use_horizontal_flip": true,
//!     "use_random_erasing": false,
//!     "use_cutout": false,
//!     "use_dual_cutout": false,
//!     "tubify": false
//! }"#)?;
//! let profile = config.validate()?;
//! ```
//!
//! The dataset, loader options and every feature toggle must be present,
//! and unknown keys are rejected, so a misspelled toggle cannot silently
//! disable an augmentation. `seed`, `dataset_root` and `tubify_depth` are
//! optional. Sub-parameters are only checked when their flag is enabled,
//! which happens when the sequences are built.

use crate::error::{PipelineError, PipelineResult};
use crate::profile::DatasetProfile;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TUBIFY_DEPTH: usize = 6;

fn default_tubify_depth() -> usize {
    DEFAULT_TUBIFY_DEPTH
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Dataset identifier, e.g. `"CIFAR10"`.
    pub dataset: String,
    pub batch_size: usize,
    pub num_workers: usize,
    pub use_gpu: bool,
    /// Parent seed for shuffling and worker reseeding.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Root directory holding one subdirectory per dataset.
    #[serde(default)]
    pub dataset_root: Option<PathBuf>,

    pub use_random_crop: bool,
    #[serde(default)]
    pub random_crop_padding: Option<u32>,

    pub use_horizontal_flip: bool,

    pub use_random_erasing: bool,
    #[serde(default)]
    pub random_erasing_prob: Option<f64>,
    #[serde(default)]
    pub random_erasing_area_ratio_range: Option<[f64; 2]>,
    #[serde(default)]
    pub random_erasing_min_aspect_ratio: Option<f64>,
    #[serde(default)]
    pub random_erasing_max_attempt: Option<u32>,

    pub use_cutout: bool,
    pub use_dual_cutout: bool,
    #[serde(default)]
    pub cutout_size: Option<u32>,
    #[serde(default)]
    pub cutout_prob: Option<f64>,
    #[serde(default)]
    pub cutout_inside: Option<bool>,

    pub tubify: bool,
    #[serde(default = "default_tubify_depth")]
    pub tubify_depth: usize,
}

impl PipelineConfig {
    /// Creates a configuration with every augmentation disabled.
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            batch_size: 1,
            num_workers: 0,
            use_gpu: false,
            seed: None,
            dataset_root: None,
            use_random_crop: false,
            random_crop_padding: None,
            use_horizontal_flip: false,
            use_random_erasing: false,
            random_erasing_prob: None,
            random_erasing_area_ratio_range: None,
            random_erasing_min_aspect_ratio: None,
            random_erasing_max_attempt: None,
            use_cutout: false,
            use_dual_cutout: false,
            cutout_size: None,
            cutout_prob: None,
            cutout_inside: None,
            tubify: false,
            tubify_depth: DEFAULT_TUBIFY_DEPTH,
        }
    }

    /// Parses a configuration mapping.
    ///
    /// A missing required key, an unknown key or a mistyped value is
    /// reported as [`PipelineError::InvalidConfiguration`].
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::invalid(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        Ok(Self::from_json_str(&text)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))?)
    }

    /// Resolves the dataset profile and checks loader-level options.
    ///
    /// The dataset check runs first, so an unknown identifier is reported
    /// as [`PipelineError::UnsupportedDataset`] whatever else is wrong.
    pub fn validate(&self) -> PipelineResult<DatasetProfile> {
        let profile = DatasetProfile::for_name(&self.dataset)?;
        if self.batch_size == 0 {
            return Err(PipelineError::invalid("batch_size must be greater than 0"));
        }
        Ok(profile)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_dataset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.dataset_root = Some(root.into());
        self
    }

    pub fn with_random_crop(mut self, padding: u32) -> Self {
        self.use_random_crop = true;
        self.random_crop_padding = Some(padding);
        self
    }

    pub fn with_horizontal_flip(mut self) -> Self {
        self.use_horizontal_flip = true;
        self
    }

    pub fn with_random_erasing(
        mut self,
        prob: f64,
        area_ratio_range: [f64; 2],
        min_aspect_ratio: f64,
        max_attempt: u32,
    ) -> Self {
        self.use_random_erasing = true;
        self.random_erasing_prob = Some(prob);
        self.random_erasing_area_ratio_range = Some(area_ratio_range);
        self.random_erasing_min_aspect_ratio = Some(min_aspect_ratio);
        self.random_erasing_max_attempt = Some(max_attempt);
        self
    }

    /// Sets the mask parameters shared by cutout and dual-cutout.
    pub fn with_cutout_params(mut self, size: u32, prob: f64, inside: bool) -> Self {
        self.cutout_size = Some(size);
        self.cutout_prob = Some(prob);
        self.cutout_inside = Some(inside);
        self
    }

    pub fn with_cutout(mut self, size: u32, prob: f64, inside: bool) -> Self {
        self.use_cutout = true;
        self.with_cutout_params(size, prob, inside)
    }

    pub fn with_dual_cutout(mut self, size: u32, prob: f64, inside: bool) -> Self {
        self.use_dual_cutout = true;
        self.with_cutout_params(size, prob, inside)
    }

    pub fn with_tubify(mut self, depth: usize) -> Self {
        self.tubify = true;
        self.tubify_depth = depth;
        self
    }
}
