#![allow(dead_code)]

use augmentation_pipeline::dataset::LabeledImage;

use anyhow::Result;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use tch::Tensor;

/// MNIST-sized images, black except for a white marker in the top-left
/// corner. The label is the item index, so every item stays identifiable
/// after shuffling.
pub fn marked_grayscale_items(n: usize) -> Vec<LabeledImage> {
    (0..n)
        .map(|i| {
            let mut img = GrayImage::new(28, 28);
            img.put_pixel(0, 0, Luma([255]));
            LabeledImage::new(DynamicImage::ImageLuma8(img), i as i64)
        })
        .collect()
}

/// CIFAR-sized images filled with a single colour.
pub fn constant_rgb_items(n: usize, pixel: [u8; 3]) -> Vec<LabeledImage> {
    (0..n)
        .map(|i| {
            let img = RgbImage::from_pixel(32, 32, Rgb(pixel));
            LabeledImage::new(DynamicImage::ImageRgb8(img), i as i64)
        })
        .collect()
}

/// Whether the marker of a `[1, H, W]` image ended up in the top-right
/// corner.
pub fn is_flipped(image: &Tensor) -> bool {
    let width = image.size()[2];
    image.double_value(&[0, 0, width - 1]) > image.double_value(&[0, 0, 0])
}

/// Collects `(label, flipped)` for every item of every batch, in the order
/// the loader yielded them.
pub fn collect_flips<I>(batches: I) -> Result<Vec<(i64, bool)>>
where
    I: IntoIterator<Item = Result<augmentation_pipeline::MiniBatch>>,
{
    let mut results = Vec::new();
    for batch in batches {
        let batch = batch?;
        let images = batch.images()?;
        let labels = batch.labels()?;
        for i in 0..batch.batch_size()? {
            results.push((labels.int64_value(&[i]), is_flipped(&images.get(i))));
        }
    }
    Ok(results)
}
