//! Individual preprocessing steps

pub mod contrast;
pub mod denoise;
pub mod resize;
pub mod sharpen;
pub mod threshold;
