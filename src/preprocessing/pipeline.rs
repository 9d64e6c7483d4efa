use crate::error::ScanError;
use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Image variants submitted for recognition, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Grayscale, upscaled when tiny, contrast and sharpness boosted, median filtered
    Enhanced,
    /// Grayscale followed by adaptive local-mean binarization
    AdaptiveThreshold,
    /// The capture exactly as acquired
    Original,
}

impl Variant {
    /// Fixed attempt order: cheapest-to-succeed first
    pub const PRIORITY: [Variant; 3] = [
        Variant::Enhanced,
        Variant::AdaptiveThreshold,
        Variant::Original,
    ];

    /// Confidence attached to text read from this variant
    pub fn base_confidence(&self) -> f32 {
        match self {
            Self::Enhanced => 0.9,
            Self::AdaptiveThreshold => 0.8,
            Self::Original => 0.7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::AdaptiveThreshold => "adaptive_threshold",
            Self::Original => "original",
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// A rendered variant together with its timing stats
#[derive(Debug, Clone, Serialize)]
pub struct RenderedVariant {
    #[serde(skip)]
    pub image: DynamicImage,
    pub variant: Variant,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Renders the preprocessing variants of a captured image
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline;

impl Pipeline {
    pub fn new() -> Self {
        Self
    }

    /// Render one variant. The source image is never modified.
    pub fn render(&self, variant: Variant, image: &DynamicImage) -> Result<RenderedVariant, ScanError> {
        let start = Instant::now();
        let mut steps_timing = Vec::new();

        let img = match variant {
            Variant::Original => image.clone(),
            Variant::Enhanced => {
                let mut img = self.run_step("grayscale", image.clone(), &mut steps_timing, grayscale)?;
                img = self.run_step("resize", img, &mut steps_timing, steps::resize::apply)?;
                img = self.run_step("contrast", img, &mut steps_timing, steps::contrast::apply)?;
                img = self.run_step("sharpen", img, &mut steps_timing, steps::sharpen::apply)?;
                self.run_step("denoise", img, &mut steps_timing, steps::denoise::apply)?
            }
            Variant::AdaptiveThreshold => {
                let img = self.run_step("grayscale", image.clone(), &mut steps_timing, grayscale)?;
                self.run_step("threshold", img, &mut steps_timing, steps::threshold::apply)?
            }
        };

        Ok(RenderedVariant {
            image: img,
            variant,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, ScanError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, ScanError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}

fn grayscale(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    Ok(DynamicImage::ImageLuma8(image.to_luma8()))
}
