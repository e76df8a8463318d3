use crate::collator::Collator;
use crate::sample::{Sample, IMAGE_FEATURE, LABEL_FEATURE};
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use tch::{Cuda, Device, Tensor};

/// A batch of transformed items, ready for the model.
///
/// Holds one tensor per feature, each with a leading batch dimension:
/// - `"image"` -> `[B, C, H, W]` (or `[B, d, C, H, W]` after depth expansion)
/// - `"label"` -> `[B]`
#[derive(Debug)]
pub struct MiniBatch {
    pub tensors: HashMap<String, Tensor>,
}

impl MiniBatch {
    /// Builds a batch with the given [`Collator`].
    ///
    /// ```ignore
    /// let batch = MiniBatch::collate(samples, &StackCollator)?;
    /// ```
    pub fn collate(samples: Vec<Sample>, collator: &dyn Collator) -> Result<Self> {
        collator.collate(&samples)
    }

    /// Returns the number of items in the batch.
    pub fn batch_size(&self) -> Result<i64> {
        self.tensors
            .values()
            .next()
            .map(|t| t.size()[0])
            .ok_or(anyhow!("Empty mini-batch"))
    }

    pub fn get(&self, feature: &str) -> Result<&Tensor> {
        self.tensors
            .get(feature)
            .ok_or_else(|| anyhow!("Feature '{}' not found in mini-batch", feature))
    }

    pub fn images(&self) -> Result<&Tensor> {
        self.get(IMAGE_FEATURE)
    }

    pub fn labels(&self) -> Result<&Tensor> {
        self.get(LABEL_FEATURE)
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Transfers all tensors to the target device (CPU/GPU).
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            tensors: self
                .tensors
                .iter()
                .map(|(feature_name, tensor)| (feature_name.clone(), tensor.to_device(device)))
                .collect(),
        }
    }

    /// Copies every tensor into page-locked host memory so a later GPU
    /// transfer can run asynchronously.
    ///
    /// Without a CUDA device there is nothing to pin for; the batch is
    /// returned unchanged.
    pub fn pin_memory(self) -> Result<Self> {
        if !Cuda::is_available() {
            tracing::debug!("CUDA unavailable, skipping pinned memory");
            return Ok(self);
        }

        let tensors = self
            .tensors
            .into_iter()
            .map(|(name, tensor)| {
                let pinned = tensor
                    .f_pin_memory(Device::Cuda(0))
                    .with_context(|| format!("Failed to pin feature '{}'", name))?;
                Ok((name, pinned))
            })
            .collect::<Result<_>>()?;
        Ok(Self { tensors })
    }
}
