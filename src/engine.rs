use crate::error::OcrError;
use crate::selector::split_lines;
use image::DynamicImage;
use serde::Serialize;

/// Confidence reported for regions the engine could not score
pub const INVALID_CONFIDENCE: f32 = -1.0;

/// Axis-aligned box of a recognized region, in pixels of the recognized image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// One recognized word or line with its location and confidence (0-100)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRegion {
    pub text: String,
    pub bounding_box: BoundingBox,
    pub confidence: f32,
}

impl TextRegion {
    pub fn has_valid_confidence(&self) -> bool {
        self.confidence >= 0.0
    }
}

/// OCR processing result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OcrOutput {
    /// All recognized text, one line per `\n`
    pub text: String,
    /// Recognized regions in reading order
    pub regions: Vec<TextRegion>,
}

impl OcrOutput {
    pub fn new(text: impl Into<String>, regions: Vec<TextRegion>) -> Self {
        Self {
            text: text.into(),
            regions,
        }
    }

    /// Plain-text result without region information
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Non-empty, whitespace-trimmed lines of the recognized text
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        split_lines(&self.text).map(str::trim).filter(|line| !line.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }

    /// Mean of the valid region confidences, 0 when there are none
    pub fn average_confidence(&self) -> f32 {
        let (sum, count) = self
            .regions
            .iter()
            .filter(|r| r.has_valid_confidence())
            .fold((0.0f32, 0usize), |(sum, count), r| (sum + r.confidence, count + 1));

        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    /// Total number of recognized characters over all non-empty lines
    pub fn text_length(&self) -> usize {
        self.lines().map(|line| line.chars().count()).sum()
    }
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text together with per-region boxes and confidences
    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError>;

    /// Recognize text only
    fn recognize_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        self.recognize(image).map(|output| output.text)
    }
}
