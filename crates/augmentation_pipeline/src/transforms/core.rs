use anyhow::Result;
use std::sync::Arc;

/// Defines the core `Transform` trait for composable preprocessing.
///
/// A `Transform<I, O>` converts one input of type `I` into one output of
/// type `O`. Implementations hold only the parameters captured at
/// construction; any randomness comes from the calling worker's RNG
/// (see [`crate::dataloader::with_worker_rng`]), so a transform can be
/// shared read-only by every worker.
///
/// Image primitives are collected into a
/// [`TransformSequence`](crate::pipeline::TransformSequence), whose shape is
/// decided by configuration at runtime.
pub trait Transform<I, O>: Send + Sync {
    /// Applies the transformation to the input
    fn apply(&self, input: I) -> Result<O>;
}

impl<I, O, T> Transform<I, O> for Arc<T>
where
    T: Transform<I, O> + ?Sized,
{
    fn apply(&self, input: I) -> Result<O> {
        (**self).apply(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView};

    struct PixelCount;
    impl Transform<DynamicImage, u32> for PixelCount {
        fn apply(&self, img: DynamicImage) -> Result<u32> {
            let (w, h) = img.dimensions();
            Ok(w * h)
        }
    }

    #[test]
    fn test_shared_transform_through_arc() -> Result<()> {
        let shared: Arc<dyn Transform<DynamicImage, u32>> = Arc::new(PixelCount);
        let clone = shared.clone();
        assert_eq!(clone.apply(DynamicImage::new_luma8(4, 4))?, 16);
        Ok(())
    }
}
