pub mod collator;
pub mod config;
pub mod dataloader;
pub mod dataset;
pub mod error;
pub mod factory;
pub mod minibatch;
pub mod pipeline;
pub mod profile;
pub mod readers;
pub mod sample;
pub mod sampler;
pub mod transforms;

pub use collator::StackCollator;
pub use config::PipelineConfig;
pub use dataloader::{DataLoader, LoaderConfig};
pub use dataset::{InMemoryDataset, LabeledImage};
pub use error::{PipelineError, PipelineResult};
pub use factory::{build_transforms, default_provider, get_loaders};
pub use minibatch::MiniBatch;
pub use pipeline::{ComposedTransform, PipelineBuilder, TransformSequence};
pub use profile::{DatasetId, DatasetProfile};
pub use readers::{ImageFolderProvider, InMemoryProvider, RawDatasetProvider, Split};
pub use sample::Sample;
pub use transforms::{Frame, Transform};
