//! Error taxonomy for pipeline construction and application.
//!
//! Configuration and profile errors surface before any data is read.
//! Runtime errors surface at the item whose transform failed and are
//! never retried: a retry would repeat or reorder random draws.

/// Errors raised by the profile resolver, the sequence builder and the
/// augmentation primitives.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// The dataset identifier does not name a known dataset family.
    #[error("unsupported dataset '{name}' (expected one of CIFAR10, CIFAR100, MNIST, FashionMNIST, KMNIST, K49)")]
    UnsupportedDataset { name: String },

    /// A flag is enabled without the sub-parameters it needs, or a value is
    /// out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A primitive received input it cannot transform.
    #[error("{primitive} failed: {reason}")]
    TransformRuntime {
        primitive: &'static str,
        reason: String,
    },
}

impl PipelineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn runtime(primitive: &'static str, reason: impl Into<String>) -> Self {
        Self::TransformRuntime {
            primitive,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results carrying a [`PipelineError`].
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
