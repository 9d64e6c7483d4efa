//! Image preprocessing for name-plate recognition
//!
//! Renders the small, fixed set of image variants the extraction strategy
//! submits to the recognizer.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, RenderedVariant, StepTiming, Variant};
