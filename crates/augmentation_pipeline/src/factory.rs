//! Loader factory: configuration in, train and test loaders out.
//!
//! ```text
//! PipelineConfig ──validate──► DatasetProfile
//!        │                          │
//!        └──────► PipelineBuilder ◄─┘
//!                   │         │
//!             train seq    test seq
//!                   │         │
//! RawDatasetProvider::load(Train / Test)
//!                   │         │
//!        InMemoryDataset + ComposedTransform
//!                   │         │
//!      DataLoader (shuffle,   DataLoader (ordered,
//!        drop last)             keep last)
//! ```
//!
//! Everything that can be wrong with the configuration is reported before
//! the provider is asked for any data.

use crate::config::PipelineConfig;
use crate::dataloader::{DataLoader, LoaderConfig};
use crate::dataset::{InMemoryDataset, LabeledImage};
use crate::error::PipelineResult;
use crate::pipeline::{ComposedTransform, PipelineBuilder, TransformSequence};
use crate::profile::{DatasetId, DatasetProfile, StorageLayout};
use crate::readers::{ImageFolderProvider, RawDatasetProvider, Split};
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Train and test loaders over decoded images.
pub type LoaderPair = (DataLoader<LabeledImage>, DataLoader<LabeledImage>);

/// Validates the configuration and builds both transform sequences.
pub fn build_transforms(
    config: &PipelineConfig,
) -> PipelineResult<(DatasetProfile, TransformSequence, TransformSequence)> {
    let profile = config.validate()?;
    let builder = PipelineBuilder::new(config, &profile);
    let train = builder.build_train()?;
    let test = builder.build_test()?;
    Ok((profile, train, test))
}

/// Builds the train and test loaders for `config` over the splits served
/// by `provider`.
///
/// - train: configured batch size, shuffled every epoch, trailing
///   incomplete batch dropped, `num_workers` workers, pinned memory when
///   `use_gpu` is set
/// - test: same batch size and workers, sampler order, trailing batch kept
///
/// Both loaders derive their worker seeds from `config.seed`.
pub fn get_loaders(config: &PipelineConfig, provider: &dyn RawDatasetProvider) -> Result<LoaderPair> {
    let (profile, train_sequence, test_sequence) = build_transforms(config)?;

    tracing::info!(
        dataset = profile.id.as_str(),
        batch_size = config.batch_size,
        num_workers = config.num_workers,
        pin_memory = config.use_gpu,
        seed = ?config.seed,
        "building data loaders"
    );

    let train_items = provider
        .load(Split::Train)
        .with_context(|| format!("Failed to load {} split of {}", Split::Train, profile.id))?;
    let test_items = provider
        .load(Split::Test)
        .with_context(|| format!("Failed to load {} split of {}", Split::Test, profile.id))?;

    let train_config = LoaderConfig::builder()
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .shuffle(true)
        .drop_last(true)
        .pin_memory(config.use_gpu)
        .maybe_seed(config.seed)
        .build();
    let test_config = LoaderConfig::builder()
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .shuffle(false)
        .drop_last(false)
        .pin_memory(config.use_gpu)
        .maybe_seed(config.seed)
        .build();

    let train_dataset =
        InMemoryDataset::new(train_items).with_transform(ComposedTransform::new(train_sequence));
    let test_dataset =
        InMemoryDataset::new(test_items).with_transform(ComposedTransform::new(test_sequence));

    let train = DataLoader::new(train_dataset, train_config).context("Failed to build train loader")?;
    let test = DataLoader::new(test_dataset, test_config).context("Failed to build test loader")?;
    Ok((train, test))
}

/// Picks the on-disk provider for a profile.
///
/// Image-folder datasets are read from `dataset_root` (default
/// `~/data/Kuzushiji`). Archive datasets need an external provider.
pub fn default_provider(
    config: &PipelineConfig,
    profile: &DatasetProfile,
) -> Result<Box<dyn RawDatasetProvider>> {
    match profile.layout {
        StorageLayout::ImageFolder => {
            let root = match &config.dataset_root {
                Some(root) => root.clone(),
                None => default_root(profile.id)?,
            };
            let dir = profile.dataset_dir(&root);
            tracing::debug!(dir = %dir.display(), "using image-folder provider");
            Ok(Box::new(
                ImageFolderProvider::new(dir).with_grayscale(profile.grayscale),
            ))
        }
        StorageLayout::Archive => bail!(
            "{} is distributed as an archive; decode it and pass an InMemoryProvider instead",
            profile.id
        ),
    }
}

fn default_root(id: DatasetId) -> Result<PathBuf> {
    let home = env::var_os("HOME").context("HOME is not set and no dataset_root was given")?;
    let home = PathBuf::from(home);
    Ok(match id {
        DatasetId::K49 => home.join("data").join("Kuzushiji"),
        _ => home.join("data"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::readers::InMemoryProvider;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl RawDatasetProvider for CountingProvider {
        fn load(&self, _split: Split) -> Result<Vec<LabeledImage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn items(n: usize) -> Vec<LabeledImage> {
        (0..n)
            .map(|i| LabeledImage::new(DynamicImage::new_rgb8(32, 32), i as i64))
            .collect()
    }

    #[test]
    fn test_build_transforms_default_cifar() -> Result<()> {
        let (profile, train, test) = build_transforms(&PipelineConfig::new("CIFAR10"))?;
        assert_eq!(profile.id, DatasetId::Cifar10);
        assert_eq!(train.names(), vec!["normalize", "to-tensor"]);
        assert_eq!(test.names(), vec!["normalize", "to-tensor"]);
        Ok(())
    }

    #[test]
    fn test_invalid_config_fails_before_loading() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let mut config = PipelineConfig::new("CIFAR10");
        config.use_cutout = true;

        let err = get_loaders(&config, &provider).err().map(|e| e.downcast::<PipelineError>());
        assert!(matches!(err, Some(Ok(PipelineError::InvalidConfiguration(_)))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_loader_policies() -> Result<()> {
        let provider = InMemoryProvider::new(items(10), items(5));
        let config = PipelineConfig::new("CIFAR10").with_batch_size(4).with_seed(3);
        let (train, test) = get_loaders(&config, &provider)?;

        assert!(train.config().shuffle);
        assert!(train.config().drop_last);
        assert_eq!(train.len(), 2);
        assert!(!test.config().shuffle);
        assert!(!test.config().drop_last);
        assert_eq!(test.len(), 2);
        assert_eq!(train.seed(), 3);
        assert_eq!(test.seed(), 3);
        Ok(())
    }

    #[test]
    fn test_default_provider_layouts() -> Result<()> {
        let config = PipelineConfig::new("K49").with_dataset_root("/datasets");
        let profile = config.validate()?;
        assert!(default_provider(&config, &profile).is_ok());

        let config = PipelineConfig::new("MNIST");
        let profile = config.validate()?;
        assert!(default_provider(&config, &profile).is_err());
        Ok(())
    }
}
