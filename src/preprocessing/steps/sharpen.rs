use crate::error::ScanError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::filter3x3;

/// Sharpness boost applied to the enhanced variant
pub const SHARPNESS_FACTOR: f32 = 1.2;

/// Sharpen by extrapolating away from a smoothed copy of the image.
///
/// A factor of 1.0 returns the input, larger factors exaggerate edges.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    Ok(DynamicImage::ImageLuma8(enhance(&image.to_luma8(), SHARPNESS_FACTOR)))
}

pub fn enhance(gray: &GrayImage, factor: f32) -> GrayImage {
    // Smoothing kernel with a strong centre weight (sums to 1)
    let kernel: [f32; 9] = [
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        5.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
    ];
    let smoothed: GrayImage = filter3x3(gray, &kernel);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let original = gray.get_pixel(x, y).0[0] as f32;
        let soft = smoothed.get_pixel(x, y).0[0] as f32;
        let value = soft + (original - soft) * factor;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
