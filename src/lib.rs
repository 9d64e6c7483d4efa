//! Recognition of game creature names from screenshots
//!
//! An image goes through a few preprocessing variants until the recognizer
//! reads some text; the text is fuzzy-matched against a multilingual
//! vocabulary and resolved into one to three entities. The live loop does
//! this periodically on a screen region and reports a detection once it has
//! been stable for a few ticks.

pub mod capture;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extraction;
pub mod live;
pub mod matcher;
pub mod preprocessing;
pub mod resolver;
pub mod result;
pub mod scanner;
pub mod server;

pub use capture::{CaptureRegion, FileGrabber, ScreenGrabber};
pub use config::Config;
pub use engine::{LanguageHint, TextRecognizer};
pub use error::ScanError;
pub use live::{detection_channel, ConfirmedDetection, DetectionConsumer};
pub use matcher::{NameMatcher, VocabularyTable};
pub use result::AnalysisResult;
pub use scanner::Scanner;
