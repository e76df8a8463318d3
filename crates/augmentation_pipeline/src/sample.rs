use crate::error::{PipelineError, PipelineResult};
use std::collections::HashMap;
use tch::Tensor;

/// Feature holding the transformed image tensor.
pub const IMAGE_FEATURE: &str = "image";
/// Feature holding the second view when a sequence yields an image pair.
pub const DUAL_IMAGE_FEATURE: &str = "image_dual";
/// Feature holding the class index as a scalar `Int64` tensor.
pub const LABEL_FEATURE: &str = "label";

/// One transformed item, keyed by feature name.
///
/// An item of a classification dataset looks like
/// `{"image": Tensor([C, H, W]), "label": Tensor([])}`, plus `"image_dual"`
/// when dual-cutout produced two views.
#[derive(Debug)]
pub struct Sample {
    pub features: HashMap<String, Tensor>,
}

/// Shallow: feature tensors share storage with the original.
impl Clone for Sample {
    fn clone(&self) -> Self {
        let features = self
            .features
            .iter()
            .map(|(k, v)| (k.clone(), v.shallow_clone()))
            .collect();
        Self { features }
    }
}

impl Sample {
    pub fn new(features: HashMap<String, Tensor>) -> Self {
        Self { features }
    }

    /// Creates a `Sample` from a single `(feature_name, tensor)` pair.
    ///
    /// Chain with [`with_feature`](Self::with_feature) to add more features.
    pub fn from_single(name: impl Into<String>, tensor: Tensor) -> Self {
        Self {
            features: HashMap::from([(name.into(), tensor)]),
        }
    }

    /// Adds or overwrites a feature.
    pub fn with_feature(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.features.insert(name.into(), tensor);
        self
    }

    pub fn get(&self, feature: &str) -> PipelineResult<&Tensor> {
        self.features.get(feature).ok_or_else(|| {
            PipelineError::runtime("sample", format!("feature {} not found", feature))
        })
    }

    pub fn image(&self) -> PipelineResult<&Tensor> {
        self.get(IMAGE_FEATURE)
    }

    pub fn label(&self) -> PipelineResult<i64> {
        Ok(self.get(LABEL_FEATURE)?.int64_value(&[]))
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}
