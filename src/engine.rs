use crate::error::ScanError;
use image::DynamicImage;
use std::fmt;

/// Languages requested from the recognizer in a single call.
///
/// Rendered Tesseract-style (`eng+fra+jpn`) so one call can resolve text
/// in any of the listed scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageHint {
    languages: Vec<String>,
}

impl LanguageHint {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for lang in languages.into_iter().map(Into::into) {
            if !unique.contains(&lang) {
                unique.push(lang);
            }
        }
        Self { languages: unique }
    }

    /// Parse a `+` or `,` separated list, e.g. "eng+fra+jpn"
    pub fn parse(s: &str) -> Self {
        Self::new(
            s.split(['+', ','])
                .map(str::trim)
                .filter(|lang| !lang.is_empty()),
        )
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl Default for LanguageHint {
    fn default() -> Self {
        Self::new(["eng", "fra", "jpn"])
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.languages.join("+"))
    }
}

/// Trait that all text recognition backends must implement
pub trait TextRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text in an in-memory image
    fn recognize(&self, image: &DynamicImage, languages: &LanguageHint)
        -> Result<String, ScanError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hint_spans_all_scripts() {
        assert_eq!(LanguageHint::default().to_string(), "eng+fra+jpn");
    }

    #[test]
    fn test_parse_accepts_plus_and_comma() {
        let hint = LanguageHint::parse("eng, fra+jpn");
        assert_eq!(hint.languages(), &["eng", "fra", "jpn"]);
    }

    #[test]
    fn test_parse_drops_duplicates_and_blanks() {
        let hint = LanguageHint::parse("eng++eng,");
        assert_eq!(hint.languages(), &["eng"]);
        assert!(LanguageHint::parse("").is_empty());
    }
}
