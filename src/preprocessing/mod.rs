//! Image preprocessing module for OCR enhancement
//!
//! One configurable pipeline that turns a photographed waybill into a
//! binarized, deskewed grayscale image sized for recognition.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PreprocessConfig, PreprocessingResult, Preset, StepTiming};
pub use steps::denoise::DenoiseStrategy;
pub use steps::resize::ResizePolicy;
pub use steps::threshold::{ThresholdMethod, ThresholdParams};
