use crate::minibatch::MiniBatch;
use crate::sample::Sample;
use anyhow::{bail, Context, Result};
use std::collections::{BTreeSet, HashMap};
use tch::Tensor;

/// Combines transformed [`Sample`]s into a [`MiniBatch`].
pub trait Collator: Send + Sync {
    fn collate(&self, samples: &[Sample]) -> Result<MiniBatch>;
}

/// Stacks each feature along a new batch dimension (dim 0).
///
/// Every sample must carry the same feature names with identical shapes;
/// augmentation sequences always emit fixed-size images, so no padding is
/// needed. Mismatches are reported with the offending sample index.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackCollator;

impl Collator for StackCollator {
    fn collate(&self, samples: &[Sample]) -> Result<MiniBatch> {
        let Some(first) = samples.first() else {
            bail!("Cannot collate empty sample list");
        };

        let keys: BTreeSet<&str> = first.features().collect();
        for (i, sample) in samples.iter().enumerate().skip(1) {
            let other: BTreeSet<&str> = sample.features().collect();
            if other != keys {
                bail!(
                    "Sample #{} has mismatched feature keys:\n -Missing: {:?}\n -Extra: {:?}",
                    i,
                    keys.difference(&other).collect::<Vec<_>>(),
                    other.difference(&keys).collect::<Vec<_>>(),
                );
            }
        }

        let mut tensors = HashMap::with_capacity(keys.len());
        for key in keys {
            let column: Vec<&Tensor> = samples
                .iter()
                .map(|s| s.get(key))
                .collect::<Result<_, _>>()
                .with_context(|| format!("Failed to gather feature '{}'", key))?;

            let reference_shape = column[0].size();
            for (i, tensor) in column.iter().enumerate() {
                if tensor.size() != reference_shape {
                    bail!(
                        "Shape mismatch in sample {} for feature '{}': expected {:?}, got {:?}",
                        i,
                        key,
                        reference_shape,
                        tensor.size()
                    );
                }
            }

            tensors.insert(key.to_string(), Tensor::stack(&column, 0));
        }
        Ok(MiniBatch { tensors })
    }
}
