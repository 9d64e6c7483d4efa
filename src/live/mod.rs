//! Periodic capture with consecutive-detection debouncing

pub mod debounce;
pub mod runner;

pub use debounce::Debouncer;
pub use runner::{
    clamp_confidence_threshold, clamp_max_entities, detection_channel, Analyzer, CaptureLoop,
    ChannelConsumer, ConfirmedDetection, DetectionConsumer, LoopSettings,
};
