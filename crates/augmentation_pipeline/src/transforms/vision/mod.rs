//! Vision primitives for image preprocessing and augmentation.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── geometric.rs     → Spatial transformations (padded random crop)
//! ├── augmentation.rs  → Random augmentation (flip, erasing, cutout)
//! ├── photometric.rs   → Normalization
//! ├── conversion.rs    → Format conversions (array ↔ image → tensor)
//! └── depth.rs         → Depth expansion
//! ```
//!
//! Every primitive implements `Transform<Frame, Frame>` and can be applied
//! on its own or as a step of a
//! [`TransformSequence`](crate::pipeline::TransformSequence):
//!
//! ```ignore
//! use crate::transforms::{Frame, Transform};
//! use crate::transforms::vision::RandomCrop;
//!
//! let cropped = RandomCrop::new(32, 4)?.apply(Frame::Image(img))?;
//! ```

pub mod augmentation;
pub mod conversion;
pub mod depth;
pub mod geometric;
pub mod photometric;

pub use augmentation::{Cutout, DualCutout, RandomErasing, RandomHorizontalFlip};
pub use conversion::{Grayscale, ImageToTensor, ToImage, ToTensor};
pub use depth::Tubify;
pub use geometric::RandomCrop;
pub use photometric::{Normalize, TensorNormalize};
