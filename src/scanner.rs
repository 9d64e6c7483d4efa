//! The scanner facade
//!
//! Wires a recognizer, the extraction strategy, the name matcher and the
//! resolver together, and owns the live capture loop and its settings.
//! Every call is safe from any thread, including while the loop runs.

use crate::capture::{CaptureRegion, ScreenGrabber};
use crate::config::Config;
use crate::engine::{LanguageHint, TextRecognizer};
use crate::error::ScanError;
use crate::extraction::ExtractionStrategy;
use crate::live::{
    clamp_confidence_threshold, clamp_max_entities, Analyzer, CaptureLoop, DetectionConsumer, LoopSettings,
};
use crate::matcher::{NameMatcher, VocabularyTable};
use crate::resolver::MultiEntityResolver;
use crate::result::AnalysisResult;
use image::DynamicImage;
use std::sync::{Arc, Mutex, RwLock};

/// Recognition pipeline shared with the loop thread
struct ScanCore {
    recognizer: Arc<dyn TextRecognizer>,
    strategy: ExtractionStrategy,
    matcher: NameMatcher,
    resolver: MultiEntityResolver,
}

impl Analyzer for ScanCore {
    fn analyze(&self, image: &DynamicImage, max_entities: usize, confidence_threshold: f32) -> AnalysisResult {
        let extractions = self.strategy.extract(image, self.recognizer.as_ref());
        for extraction in &extractions {
            tracing::debug!("Read '{}' from {} variant", extraction.text, extraction.variant.as_str());
        }

        let resolution = self
            .resolver
            .resolve(&self.matcher, &extractions, max_entities, confidence_threshold);
        AnalysisResult::from_resolution(resolution, max_entities, self.resolver.tuning().alternatives)
    }
}

pub struct Scanner {
    core: Arc<ScanCore>,
    grabber: Arc<dyn ScreenGrabber>,
    settings: Arc<RwLock<LoopSettings>>,
    capture: Mutex<Option<CaptureLoop>>,
}

impl Scanner {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        vocabulary: &VocabularyTable,
        grabber: Arc<dyn ScreenGrabber>,
    ) -> Self {
        Self::with_options(
            recognizer,
            vocabulary,
            grabber,
            LanguageHint::default(),
            LoopSettings::default(),
        )
    }

    pub fn with_options(
        recognizer: Arc<dyn TextRecognizer>,
        vocabulary: &VocabularyTable,
        grabber: Arc<dyn ScreenGrabber>,
        languages: LanguageHint,
        settings: LoopSettings,
    ) -> Self {
        tracing::info!(
            "Scanner ready: engine {}, languages {}, {} vocabulary entries",
            recognizer.name(),
            languages,
            vocabulary.len()
        );

        Self {
            core: Arc::new(ScanCore {
                recognizer,
                strategy: ExtractionStrategy::new(languages),
                matcher: NameMatcher::new(vocabulary),
                resolver: MultiEntityResolver::default(),
            }),
            grabber,
            settings: Arc::new(RwLock::new(settings)),
            capture: Mutex::new(None),
        }
    }

    /// Build from configuration: loads the vocabulary file and saved region
    pub fn from_config(
        config: &Config,
        recognizer: Arc<dyn TextRecognizer>,
        grabber: Arc<dyn ScreenGrabber>,
    ) -> Result<Self, ScanError> {
        let vocabulary = match &config.vocabulary_path {
            Some(path) => VocabularyTable::load(path)?,
            None => {
                tracing::warn!("No vocabulary configured; nothing will be recognized until one is set");
                VocabularyTable::new()
            }
        };

        let mut settings = config.loop_settings();
        settings.region = CaptureRegion::load(&config.region_file)?;
        if let Some(region) = settings.region {
            tracing::info!("Loaded capture region {} from {}", region, config.region_file.display());
        }

        Ok(Self::with_options(
            recognizer,
            &vocabulary,
            grabber,
            config.languages.clone(),
            settings,
        ))
    }

    /// Identify the entities in one image.
    ///
    /// `max_entities` and `confidence_threshold` are clamped. Nothing
    /// recognized is an unsuccessful result, not an error.
    pub fn analyze_single_image(
        &self,
        image: &DynamicImage,
        max_entities: usize,
        confidence_threshold: f32,
    ) -> AnalysisResult {
        self.core.analyze(
            image,
            clamp_max_entities(max_entities),
            clamp_confidence_threshold(confidence_threshold),
        )
    }

    /// Start the live loop. Returns false when it is already running or no
    /// capture region is set.
    pub fn start_loop<C>(
        &self,
        interval_secs: f64,
        consumer: C,
        sensitivity: u32,
        confidence_threshold: f32,
    ) -> bool
    where
        C: DetectionConsumer + 'static,
    {
        let mut capture = self.lock_capture();
        if capture.as_ref().is_some_and(CaptureLoop::is_running) {
            tracing::warn!("Capture loop is already running");
            return false;
        }

        {
            let mut settings = self.write_settings();
            if settings.region.is_none() {
                tracing::warn!("Cannot start capture loop: no region set");
                return false;
            }
            settings.set_interval_secs(interval_secs);
            settings.set_sensitivity(sensitivity);
            settings.set_confidence_threshold(confidence_threshold);
        }

        // A loop whose last tick outlived `stop_loop` is reaped before starting anew
        if let Some(mut previous) = capture.take() {
            if !previous.stop() {
                tracing::warn!("Cannot start capture loop: previous tick still in flight");
                *capture = Some(previous);
                return false;
            }
        }

        match CaptureLoop::spawn(
            Arc::clone(&self.core) as Arc<dyn Analyzer>,
            Arc::clone(&self.grabber),
            Arc::clone(&self.settings),
            Box::new(consumer),
        ) {
            Ok(started) => {
                *capture = Some(started);
                true
            }
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        }
    }

    /// Stop the live loop, waiting a bounded time for the current tick.
    ///
    /// Returns false if no loop was running or it did not stop in time. A
    /// loop that did not stop in time no longer notifies its consumer, and
    /// is kept so that the next `start_loop` waits for it.
    pub fn stop_loop(&self) -> bool {
        let running = self.lock_capture().take();
        let Some(mut capture) = running else {
            return false;
        };

        if capture.stop() {
            return true;
        }

        let mut slot = self.lock_capture();
        if slot.is_none() {
            *slot = Some(capture);
        }
        false
    }

    pub fn is_running(&self) -> bool {
        self.lock_capture()
            .as_ref()
            .is_some_and(CaptureLoop::is_running)
    }

    pub fn set_max_entities(&self, max_entities: usize) {
        self.write_settings().set_max_entities(max_entities);
    }

    pub fn set_confidence_threshold(&self, threshold: f32) {
        self.write_settings().set_confidence_threshold(threshold);
    }

    pub fn set_sensitivity(&self, sensitivity: u32) {
        self.write_settings().set_sensitivity(sensitivity);
    }

    pub fn set_interval(&self, secs: f64) {
        self.write_settings().set_interval_secs(secs);
    }

    pub fn set_region(&self, region: CaptureRegion) {
        tracing::info!("Capture region set to {}", region);
        self.write_settings().region = Some(region);
    }

    pub fn region(&self) -> Option<CaptureRegion> {
        self.settings().region
    }

    /// Current loop settings
    pub fn settings(&self) -> LoopSettings {
        *self.settings.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the vocabulary with display strings that are their own
    /// canonical names; legal while the loop runs
    pub fn update_vocabulary<I, S>(&self, display_strings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_vocabulary_table(&VocabularyTable::from_display_strings(display_strings));
    }

    pub fn update_vocabulary_table(&self, table: &VocabularyTable) {
        self.core.matcher.replace_vocabulary(table);
    }

    /// Number of normalized keys in the current vocabulary index
    pub fn vocabulary_size(&self) -> usize {
        self.core.matcher.snapshot().len()
    }

    pub fn recognizer(&self) -> &Arc<dyn TextRecognizer> {
        &self.core.recognizer
    }

    pub fn languages(&self) -> &LanguageHint {
        self.core.strategy.languages()
    }

    fn lock_capture(&self) -> std::sync::MutexGuard<'_, Option<CaptureLoop>> {
        self.capture.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_settings(&self) -> std::sync::RwLockWriteGuard<'_, LoopSettings> {
        self.settings.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
