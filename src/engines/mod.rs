//! Text recognizer implementations
//!
//! This module contains implementations of the TextRecognizer trait for
//! different OCR backends. Engines are conditionally compiled based on
//! feature flags.

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
mod download;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::TextRecognizer;
use crate::error::ScanError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available recognizers
pub struct EngineRegistry {
    engines: Vec<Arc<dyn TextRecognizer>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a registry with the configured engine, or every compiled-in
    /// engine when none is named
    pub fn new(config: &Config) -> Result<Self, ScanError> {
        #[allow(unused_variables)]
        let wanted = |name: &str| config.engine.as_deref().map_or(true, |e| e == name);
        #[allow(unused_mut)]
        let mut engines: Vec<Arc<dyn TextRecognizer>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            if wanted("ocrs") {
                engines.push(Arc::new(ocrs::OcrsRecognizer::new(config)?));
            }
        }

        #[cfg(feature = "engine-leptess")]
        {
            if wanted("tesseract") {
                tracing::info!("Initializing tesseract engine...");
                engines.push(Arc::new(leptess::TesseractRecognizer::new(config)?));
            }
        }

        if engines.is_empty() {
            return Err(ScanError::InitializationError(match &config.engine {
                Some(name) => format!("Engine '{}' is not available in this build", name),
                None => "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess"
                    .to_string(),
            }));
        }

        Ok(Self::from_engines(engines))
    }

    /// Registry over already constructed recognizers; the first is the default
    pub fn from_engines(engines: Vec<Arc<dyn TextRecognizer>>) -> Self {
        let default_engine = engines
            .first()
            .map(|e| e.name().to_string())
            .unwrap_or_default();
        Self {
            engines,
            default_engine,
        }
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn TextRecognizer>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default_engine(&self) -> Option<Arc<dyn TextRecognizer>> {
        self.get(&self.default_engine)
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// The named engine, or the default one
    pub fn select(&self, name: Option<&str>) -> Result<Arc<dyn TextRecognizer>, ScanError> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| {
                ScanError::InitializationError(format!(
                    "Unknown engine '{}'. Available: {}",
                    name,
                    self.list().join(", ")
                ))
            }),
            None => self
                .default_engine()
                .ok_or_else(|| ScanError::InitializationError("No OCR engines available".to_string())),
        }
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_languages: e.supported_languages(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LanguageHint;
    use image::DynamicImage;

    struct Named(&'static str);

    impl TextRecognizer for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "stub"
        }

        fn recognize(&self, _image: &DynamicImage, _languages: &LanguageHint) -> Result<String, ScanError> {
            Ok(String::new())
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }
    }

    fn registry() -> EngineRegistry {
        EngineRegistry::from_engines(vec![Arc::new(Named("ocrs")), Arc::new(Named("tesseract"))])
    }

    #[test]
    fn test_first_engine_is_default() {
        let registry = registry();
        assert_eq!(registry.default_name(), "ocrs");
        assert_eq!(registry.select(None).unwrap().name(), "ocrs");
    }

    #[test]
    fn test_select_by_name() {
        assert_eq!(registry().select(Some("tesseract")).unwrap().name(), "tesseract");
    }

    #[test]
    fn test_unknown_engine_lists_available() {
        let err = registry().select(Some("paddle")).err().unwrap();
        assert!(err.to_string().contains("ocrs, tesseract"));
    }

    #[test]
    fn test_info() {
        let info = registry().info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[1].name, "tesseract");
    }

    #[test]
    fn test_empty_registry_has_no_default() {
        assert!(EngineRegistry::from_engines(Vec::new()).select(None).is_err());
    }
}
