//! Multi-attempt text extraction with early stop
//!
//! Variants are tried in [`Variant::PRIORITY`] order and the first one that
//! yields non-blank text ends the attempt sequence, so the common case costs
//! a single recognition call.

use crate::engine::{LanguageHint, TextRecognizer};
use crate::preprocessing::{Pipeline, Variant};
use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;

/// Text read from one image variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub variant: Variant,
    pub base_confidence: f32,
}

pub struct ExtractionStrategy {
    pipeline: Pipeline,
    languages: LanguageHint,
}

impl ExtractionStrategy {
    pub fn new(languages: LanguageHint) -> Self {
        Self {
            pipeline: Pipeline::new(),
            languages,
        }
    }

    pub fn languages(&self) -> &LanguageHint {
        &self.languages
    }

    /// Read text from `image`, stopping at the first variant that produces any.
    ///
    /// Failures of individual attempts count as "no text"; an empty list
    /// means every variant came back blank or failed.
    pub fn extract(&self, image: &DynamicImage, recognizer: &dyn TextRecognizer) -> Vec<ExtractionResult> {
        for variant in Variant::PRIORITY {
            if let Some(text) = self.attempt(variant, image, recognizer) {
                return vec![ExtractionResult {
                    text,
                    variant,
                    base_confidence: variant.base_confidence(),
                }];
            }
        }

        tracing::debug!("No variant produced text");
        Vec::new()
    }

    fn attempt(
        &self,
        variant: Variant,
        image: &DynamicImage,
        recognizer: &dyn TextRecognizer,
    ) -> Option<String> {
        let start = Instant::now();

        let rendered = match self.pipeline.render(variant, image) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!("Preprocessing for {} failed: {}", variant.as_str(), e);
                return None;
            }
        };

        let text = match recognizer.recognize(&rendered.image, &self.languages) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "{} recognition on {} variant failed: {}",
                    recognizer.name(),
                    variant.as_str(),
                    e
                );
                return None;
            }
        };

        let trimmed = text.trim();
        tracing::debug!(
            "Variant {} read {} chars in {}ms",
            variant.as_str(),
            trimmed.chars().count(),
            start.elapsed().as_millis()
        );

        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for ExtractionStrategy {
    fn default() -> Self {
        Self::new(LanguageHint::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use image::GrayImage;
    use std::sync::Mutex;

    /// Recognizer returning scripted answers, one per call
    struct ScriptedRecognizer {
        answers: Mutex<Vec<Result<String, ScanError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRecognizer {
        fn new(answers: Vec<Result<String, ScanError>>) -> Self {
            Self {
                answers: Mutex::new(answers),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn description(&self) -> &'static str {
            "test double"
        }

        fn recognize(&self, _image: &DynamicImage, languages: &LanguageHint) -> Result<String, ScanError> {
            self.calls.lock().unwrap().push(languages.to_string());
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                Ok(String::new())
            } else {
                answers.remove(0)
            }
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(300, 60, image::Luma([200])))
    }

    #[test]
    fn test_first_variant_success_stops_early() {
        let recognizer = ScriptedRecognizer::new(vec![Ok("Pikachu".to_string())]);

        let results = ExtractionStrategy::default().extract(&image(), &recognizer);

        assert_eq!(recognizer.call_count(), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].variant, Variant::Enhanced);
        assert_eq!(results[0].base_confidence, 0.9);
    }

    #[test]
    fn test_blank_text_falls_through_to_next_variant() {
        let recognizer = ScriptedRecognizer::new(vec![Ok("  \n ".to_string()), Ok(" Évoli \n".to_string())]);

        let results = ExtractionStrategy::default().extract(&image(), &recognizer);

        assert_eq!(recognizer.call_count(), 2);
        assert_eq!(results[0].variant, Variant::AdaptiveThreshold);
        assert_eq!(results[0].text, "Évoli");
    }

    #[test]
    fn test_recognizer_errors_are_not_fatal() {
        let recognizer = ScriptedRecognizer::new(vec![
            Err(ScanError::RecognitionError("boom".into())),
            Err(ScanError::RecognitionError("boom".into())),
            Ok("Mew".to_string()),
        ]);

        let results = ExtractionStrategy::default().extract(&image(), &recognizer);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].variant, Variant::Original);
        assert_eq!(results[0].base_confidence, 0.7);
    }

    #[test]
    fn test_all_variants_blank_yields_empty_list() {
        let recognizer = ScriptedRecognizer::new(vec![]);
        let results = ExtractionStrategy::default().extract(&image(), &recognizer);
        assert!(results.is_empty());
        assert_eq!(recognizer.call_count(), 3);
    }

    #[test]
    fn test_union_language_hint_is_passed() {
        let recognizer = ScriptedRecognizer::new(vec![Ok("Mew".to_string())]);
        ExtractionStrategy::new(LanguageHint::parse("eng+jpn")).extract(&image(), &recognizer);
        assert_eq!(recognizer.calls.lock().unwrap()[0], "eng+jpn");
    }
}
