//! Configuration-driven transform sequences.
//!
//! ```text
//! PipelineConfig ──validate──► DatasetProfile
//!        │                          │
//!        └──────► PipelineBuilder ◄─┘
//!                   │         │
//!           build_train   build_test
//!                   ▼         ▼
//!             TransformSequence (Vec<Primitive>)
//!                        │
//!                ComposedTransform ──► InMemoryDataset::with_transform
//! ```

pub mod builder;
pub mod composed;
pub mod primitive;
pub mod sequence;

pub use builder::PipelineBuilder;
pub use composed::ComposedTransform;
pub use primitive::{Primitive, PrimitiveKind};
pub use sequence::TransformSequence;
