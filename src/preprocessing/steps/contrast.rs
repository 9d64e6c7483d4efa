use crate::error::ScanError;
use image::{DynamicImage, GrayImage, Luma};

/// Contrast boost applied to the enhanced variant
pub const CONTRAST_FACTOR: f32 = 1.5;

/// Boost contrast by pushing every pixel away from the mean luminance.
///
/// out = mean + (pixel - mean) * factor, clamped to 0..=255
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    Ok(DynamicImage::ImageLuma8(enhance(&image.to_luma8(), CONTRAST_FACTOR)))
}

pub fn enhance(gray: &GrayImage, factor: f32) -> GrayImage {
    let mean = mean_luminance(gray);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let pixel = gray.get_pixel(x, y).0[0] as f32;
        let value = mean + (pixel - mean) * factor;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

fn mean_luminance(img: &GrayImage) -> f32 {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    sum as f32 / count as f32
}
