use crate::error::ScanError;
use image::DynamicImage;
use imageproc::filter::median_filter;

/// 3x3 median filter, removes isolated specks left over by contrast boosting
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    let gray = image.to_luma8();
    Ok(DynamicImage::ImageLuma8(median_filter(&gray, 1, 1)))
}
