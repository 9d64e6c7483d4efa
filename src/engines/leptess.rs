//! Tesseract engine implementation
//!
//! Uses the tesseract-static crate for static linking (no system
//! dependencies). Honours the union language hint, so one call reads Latin
//! and Japanese names alike. Downloads tessdata for every configured
//! language on first use.

use super::download::ensure_downloaded;
use crate::config::Config;
use crate::engine::{LanguageHint, TextRecognizer};
use crate::error::ScanError;
use image::DynamicImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

pub struct TesseractRecognizer {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Languages with traineddata present in `tessdata_path`
    available: Vec<String>,
}

impl TesseractRecognizer {
    pub fn new(config: &Config) -> Result<Self, ScanError> {
        let tessdata_dir = match &config.tessdata_path {
            Some(path) => PathBuf::from(path),
            None => config.cache_root().join("tessdata"),
        };

        let mut available = Vec::new();
        for language in config.languages.languages() {
            let filename = format!("{}.traineddata", language);
            match ensure_downloaded(&tessdata_url(language), &tessdata_dir, &filename) {
                Ok(_) => available.push(language.clone()),
                Err(e) => tracing::warn!("No tessdata for '{}': {}", language, e),
            }
        }

        if available.is_empty() {
            return Err(ScanError::InitializationError(format!(
                "No tessdata available for {}",
                config.languages
            )));
        }

        let tessdata_path = tessdata_dir
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ScanError::InitializationError("Invalid tessdata path".to_string()))?;

        // Validate that tessdata is accessible by doing a test initialization
        let languages = available.join("+");
        Tesseract::new(Some(&tessdata_path), Some(&languages)).map_err(|e| {
            ScanError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Tesseract engine initialized (tessdata: {}, languages: {})",
            tessdata_path,
            languages
        );

        Ok(Self {
            tessdata_path,
            available,
        })
    }

    /// The requested languages we have data for, Tesseract-style
    fn language_arg(&self, hint: &LanguageHint) -> Result<String, ScanError> {
        select_languages(hint, &self.available).ok_or_else(|| {
            ScanError::RecognitionError(format!("No tessdata for any of {}", hint))
        })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - multilingual, reads several scripts in one call"
    }

    fn recognize(&self, image: &DynamicImage, languages: &LanguageHint) -> Result<String, ScanError> {
        let rgb_img = image.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        // Convert to BMP in memory (BMP is always supported by leptonica)
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| ScanError::RecognitionError(format!("Failed to convert to BMP: {}", e)))?;

        let language_arg = self.language_arg(languages)?;
        tracing::debug!(
            "Recognizing {}x{} image with {} ({} bytes)",
            width,
            height,
            language_arg,
            bmp_data.len()
        );

        let tess = Tesseract::new(Some(&self.tessdata_path), Some(&language_arg))
            .map_err(|e| ScanError::RecognitionError(format!("Failed to create Tesseract: {}", e)))?;

        let mut tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            ScanError::RecognitionError(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| ScanError::RecognitionError(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| ScanError::RecognitionError(format!("Failed to get text: {}", e)))?;

        Ok(text.trim().to_string())
    }

    fn supported_languages(&self) -> Vec<String> {
        self.available.clone()
    }
}

/// Intersect `hint` with `available`, keeping the hint's order
fn select_languages(hint: &LanguageHint, available: &[String]) -> Option<String> {
    let selected: Vec<&str> = hint
        .languages()
        .iter()
        .filter(|lang| available.contains(lang))
        .map(String::as_str)
        .collect();

    if selected.is_empty() {
        None
    } else {
        Some(selected.join("+"))
    }
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
