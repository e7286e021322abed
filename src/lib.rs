//! Extracts the `_1_` waybill ID line from photographed waybills.
//!
//! The chain is load, preprocess, rotation search over pluggable OCR engines,
//! then line selection. [`extract::Extractor`] runs it for one image; the
//! [`evaluate`] harness and the [`server`] wrap it.

pub mod cli;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod evaluate;
pub mod extract;
pub mod loader;
pub mod preprocessing;
pub mod rotation;
pub mod selector;
pub mod server;

pub use engine::{BoundingBox, OcrEngine, OcrOutput, TextRegion};
pub use error::OcrError;
pub use extract::{Extraction, Extractor};
pub use selector::find_target_line;
