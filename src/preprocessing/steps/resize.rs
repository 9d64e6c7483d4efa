use crate::error::ScanError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Captures narrower than this are hard to read for the recognizer
pub const MIN_LEGIBLE_WIDTH: u32 = 200;
/// Captures shorter than this are hard to read for the recognizer
pub const MIN_LEGIBLE_HEIGHT: u32 = 50;
/// Upscale factor applied at least once an image is below the floor
const MIN_UPSCALE: f32 = 2.0;

/// Upscale images whose width or height falls below the legibility floor.
///
/// Name plates cropped from a game screen are often only a few dozen
/// pixels tall. Larger captures are returned untouched.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    let (width, height) = image.dimensions();

    if width == 0 || height == 0 {
        return Err(ScanError::PreprocessingError(format!(
            "Cannot resize empty image ({}x{})",
            width, height
        )));
    }

    if width >= MIN_LEGIBLE_WIDTH && height >= MIN_LEGIBLE_HEIGHT {
        return Ok(image);
    }

    let scale = upscale_factor(width, height);
    let new_width = (width as f32 * scale).round() as u32;
    let new_height = (height as f32 * scale).round() as u32;

    Ok(image.resize_exact(new_width, new_height, FilterType::Lanczos3))
}

fn upscale_factor(width: u32, height: u32) -> f32 {
    let width_scale = MIN_LEGIBLE_WIDTH as f32 / width as f32;
    let height_scale = MIN_LEGIBLE_HEIGHT as f32 / height as f32;
    width_scale.max(height_scale).max(MIN_UPSCALE)
}
